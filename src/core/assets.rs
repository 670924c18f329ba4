//! Embedded rule sets.
//!
//! The default agent-standards rules are baked into the binary so a bare
//! `agent-conform check` works without any files on disk.

macro_rules! embedded_rules {
    ($($name:expr => $const_name:ident),* $(,)?) => {
        $(
            pub const $const_name: &str =
                include_str!(concat!("../../rules/", $name));
        )*

        pub fn get_embedded_rules(name: &str) -> Option<&'static str> {
            match name {
                $( $name => Some($const_name), )*
                _ => None,
            }
        }

        pub fn list_rules() -> Vec<&'static str> {
            vec![ $( $name, )* ]
        }
    };
}

embedded_rules! {
    "agent_standards.toml" => EMBEDDED_AGENT_STANDARDS,
}

pub const DEFAULT_RULES: &str = "agent_standards.toml";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::RuleSet;

    #[test]
    fn every_embedded_rule_set_compiles() {
        for name in list_rules() {
            let content = get_embedded_rules(name).unwrap();
            assert!(
                RuleSet::from_toml_str(content).is_ok(),
                "embedded rule set {} does not compile",
                name
            );
        }
    }

    #[test]
    fn default_rules_are_embedded() {
        assert!(get_embedded_rules(DEFAULT_RULES).is_some());
        assert!(get_embedded_rules("missing.toml").is_none());
    }
}
