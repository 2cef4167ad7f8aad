//! Node category (class) priority
//!
//! A node carries many labels (`biolink:SmallMolecule;biolink:ChemicalEntity;...`).
//! Tables are keyed by one preferred class: the first label found in a fixed
//! priority list.

use serde::{Deserialize, Serialize};

/// Default class priority, most specific first
pub const DEFAULT_PRIORITY: &[&str] = &[
    "biolink:GeneFamily",
    "biolink:Gene",
    "biolink:Protein",
    "biolink:SmallMolecule",
    "biolink:MolecularMixture",
    "biolink:ChemicalMixture",
    "biolink:PhenotypicFeature",
    "biolink:Disease",
    "biolink:SequenceVariant",
    "biolink:CellularComponent",
    "biolink:Cell",
    "biolink:AnatomicalEntity",
    "biolink:MolecularActivity",
    "biolink:BiologicalProcess",
    "biolink:Pathway",
    "biolink:OrganismTaxon",
    "biolink:Phenomenon",
    "biolink:Procedure",
    "biolink:Device",
    "biolink:OrganismAttribute",
    "biolink:ClinicalAttribute",
    "biolink:Activity",
    "biolink:InformationContentEntity",
    "biolink:ChemicalEntity",
    "biolink:BiologicalEntity",
];

/// Separator used for multi-valued cells in the CSV exports
pub const LABEL_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryPriority {
    order: Vec<String>,
}

impl Default for CategoryPriority {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY.iter().copied())
    }
}

impl CategoryPriority {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn preferred_position<S: AsRef<str>>(&self, labels: &[S]) -> Option<usize> {
        self.order
            .iter()
            .find_map(|wanted| labels.iter().position(|label| label.as_ref() == wanted.as_str()))
    }

    /// The label [`reorder_labels`](Self::reorder_labels) puts first: the
    /// highest-priority one present, else the first. `None` only when empty.
    pub fn primary<'a, S: AsRef<str>>(&self, labels: &'a [S]) -> Option<&'a str> {
        let pos = self.preferred_position(labels).unwrap_or(0);
        labels.get(pos).map(AsRef::as_ref)
    }

    /// Dedup and move the preferred label to the front.
    ///
    /// Labels keep their first-seen relative order; when none of them is in
    /// the priority list the order is left alone.
    pub fn reorder_labels<S: AsRef<str>>(&self, labels: &[S]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            let label = label.as_ref();
            if !out.iter().any(|seen| seen == label) {
                out.push(label.to_string());
            }
        }

        if let Some(pos) = self.preferred_position(&out) {
            if pos != 0 {
                let label = out.remove(pos);
                out.insert(0, label);
            }
        }

        out
    }

    /// Same as [`reorder_labels`](Self::reorder_labels) on a `;`-joined cell
    pub fn reorder(&self, cell: &str) -> String {
        let labels: Vec<&str> = cell.split(LABEL_SEPARATOR).collect();
        self.reorder_labels(&labels).join(&LABEL_SEPARATOR.to_string())
    }
}

/// `biolink:Gene` → `Gene`
pub fn class_name(label: &str) -> &str {
    label.rsplit(':').next().unwrap_or(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reorder_moves_preferred_to_front() {
        let priority = CategoryPriority::default();
        let cell = "biolink:NamedThing;biolink:ChemicalEntity;biolink:SmallMolecule;biolink:MolecularEntity";

        assert_eq!(
            priority.reorder(cell),
            "biolink:SmallMolecule;biolink:NamedThing;biolink:ChemicalEntity;biolink:MolecularEntity"
        );
    }

    #[test]
    fn test_reorder_respects_priority_not_position() {
        // Gene outranks Protein even though Protein comes first
        let priority = CategoryPriority::default();
        assert_eq!(
            priority.reorder("biolink:Protein;biolink:Gene"),
            "biolink:Gene;biolink:Protein"
        );
    }

    #[test]
    fn test_reorder_dedups() {
        let priority = CategoryPriority::default();
        assert_eq!(
            priority.reorder("biolink:Disease;biolink:NamedThing;biolink:Disease"),
            "biolink:Disease;biolink:NamedThing"
        );
    }

    #[test]
    fn test_reorder_unknown_labels_untouched() {
        let priority = CategoryPriority::default();
        assert_eq!(
            priority.reorder("biolink:NamedThing;biolink:Entity"),
            "biolink:NamedThing;biolink:Entity"
        );
    }

    #[test]
    fn test_primary() {
        let priority = CategoryPriority::default();
        let labels = ["biolink:BiologicalEntity", "biolink:Pathway"];
        assert_eq!(priority.primary(&labels), Some("biolink:Pathway"));

        let unranked = ["biolink:NamedThing", "biolink:Entity"];
        assert_eq!(priority.primary(&unranked), Some("biolink:NamedThing"));
        assert_eq!(
            priority.primary(&unranked),
            priority.reorder_labels(&unranked).first().map(String::as_str)
        );

        let empty: [&str; 0] = [];
        assert_eq!(priority.primary(&empty), None);
    }

    #[test]
    fn test_custom_priority() {
        let priority = CategoryPriority::new(["x:B", "x:A"]);
        assert_eq!(priority.reorder("x:A;x:B"), "x:B;x:A");
        assert_eq!(priority.len(), 2);
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("biolink:Gene"), "Gene");
        assert_eq!(class_name("Gene"), "Gene");
    }
}
