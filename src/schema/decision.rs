use serde::{Deserialize, Serialize};

/// Newtype wrapper for decision IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

/// One selectable answer. The value is opaque to the scheduler; only the
/// director interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    pub value: String,
}

impl DecisionOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A blocking choice point. `scene` names the scene whose exit this
/// decision resolves; it stands in for a resolution callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub scene: String,
    pub options: Vec<DecisionOption>,
}

impl Decision {
    /// Look up an option by its value.
    pub fn option(&self, value: &str) -> Option<&DecisionOption> {
        self.options.iter().find(|opt| opt.value == value)
    }
}

/// The player's binary judgment on the central accusation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Guilty,
    NotGuilty,
}

impl Verdict {
    /// Parse the option value used by verdict gates.
    pub fn from_value(value: &str) -> Option<Verdict> {
        match value {
            "guilty" => Some(Self::Guilty),
            "not-guilty" => Some(Self::NotGuilty),
            _ => None,
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            Self::Guilty => "guilty",
            Self::NotGuilty => "not-guilty",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_lookup() {
        let decision = Decision {
            id: DecisionId(1),
            scene: "explanation".to_string(),
            options: vec![
                DecisionOption::new("Flora is guilty", "guilty"),
                DecisionOption::new("Not sufficient", "not-guilty"),
            ],
        };
        assert_eq!(decision.option("guilty").map(|o| o.label.as_str()), Some("Flora is guilty"));
        assert!(decision.option("maybe").is_none());
    }

    #[test]
    fn verdict_values() {
        assert_eq!(Verdict::from_value("guilty"), Some(Verdict::Guilty));
        assert_eq!(Verdict::from_value("not-guilty"), Some(Verdict::NotGuilty));
        assert_eq!(Verdict::from_value("Guilty"), None);
        assert_eq!(Verdict::NotGuilty.value(), "not-guilty");
    }
}
