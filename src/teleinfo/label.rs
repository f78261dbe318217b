//! Historic-mode label vocabulary.
//!
//! The set of labels carrying integer values is part of the wire contract: a
//! value is parsed as an integer because of its label, never because of its
//! shape. Labels outside [`Label`] are accepted and kept as text.

use std::fmt;

/// Semantic type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Integer,
    Text,
}

/// Labels emitted by a single-phase meter in historic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Meter address (12 digits)
    Adco,
    /// Tariff option (`BASE`, `HC..`, `EJP.`, `BBRx`)
    Optarif,
    /// Subscribed current, A
    Isousc,
    /// Base index, Wh
    Base,
    /// Off-peak hours index, Wh
    Hchc,
    /// Peak hours index, Wh
    Hchp,
    /// Current tariff period
    Ptec,
    /// Instantaneous current, A
    Iinst,
    /// Maximum current called, A
    Imax,
    /// Apparent power, VA
    Papp,
    /// Peak/off-peak hours schedule
    Hhphc,
    /// Meter status word
    Motdetat,
}

impl Label {
    pub const ALL: [Label; 12] = [
        Label::Adco,
        Label::Optarif,
        Label::Isousc,
        Label::Base,
        Label::Hchc,
        Label::Hchp,
        Label::Ptec,
        Label::Iinst,
        Label::Imax,
        Label::Papp,
        Label::Hhphc,
        Label::Motdetat,
    ];

    /// Looks up a label by its wire name. Matching is exact.
    pub fn from_key(key: &str) -> Option<Label> {
        Label::ALL.into_iter().find(|label| label.as_str() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Adco => "ADCO",
            Label::Optarif => "OPTARIF",
            Label::Isousc => "ISOUSC",
            Label::Base => "BASE",
            Label::Hchc => "HCHC",
            Label::Hchp => "HCHP",
            Label::Ptec => "PTEC",
            Label::Iinst => "IINST",
            Label::Imax => "IMAX",
            Label::Papp => "PAPP",
            Label::Hhphc => "HHPHC",
            Label::Motdetat => "MOTDETAT",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Label::Base
            | Label::Imax
            | Label::Hchc
            | Label::Iinst
            | Label::Papp
            | Label::Isousc
            | Label::Adco
            | Label::Hchp => ValueKind::Integer,
            Label::Optarif | Label::Ptec | Label::Hhphc | Label::Motdetat => ValueKind::Text,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value kind for any key found on the wire. Unknown keys are text.
pub fn value_kind(key: &str) -> ValueKind {
    Label::from_key(key).map_or(ValueKind::Text, Label::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_set_is_exact() {
        let numeric: Vec<&str> = Label::ALL
            .into_iter()
            .filter(|l| l.kind() == ValueKind::Integer)
            .map(Label::as_str)
            .collect();
        assert_eq!(
            numeric,
            vec!["ADCO", "ISOUSC", "BASE", "HCHC", "HCHP", "IINST", "IMAX", "PAPP"]
        );
    }

    #[test]
    fn test_round_trip_names() {
        for label in Label::ALL {
            assert_eq!(Label::from_key(label.as_str()), Some(label));
            assert_eq!(label.to_string(), label.as_str());
        }
    }

    #[test]
    fn test_unknown_and_case_sensitive_keys_are_text() {
        assert_eq!(value_kind("IINST"), ValueKind::Integer);
        assert_eq!(value_kind("iinst"), ValueKind::Text);
        assert_eq!(value_kind("PEJP"), ValueKind::Text);
        assert_eq!(value_kind(""), ValueKind::Text);
    }
}
