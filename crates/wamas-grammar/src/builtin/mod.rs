//! Grammars and tables shipped with the library

mod article;
mod partner;
mod picking;
mod reception;
mod returns;

use crate::registry::RegistryBuilder;
use crate::unit_code::UnitCodeMap;

/// Root element of flattened UBL despatch advices
const DOC: &str = "DespatchAdvice";

/// Repeated line group of a despatch advice
pub const DESPATCH_LINE: &str = "DespatchAdvice.cac:DespatchLine";

fn doc(path: &str) -> String {
    format!("{DOC}.{path}")
}

fn line(path: &str) -> String {
    format!("{DESPATCH_LINE}.%s.{path}")
}

pub(crate) fn install(builder: RegistryBuilder) -> RegistryBuilder {
    let builder = builder.with_unit_codes(UnitCodeMap::builtin());
    let builder = article::install(builder);
    let builder = partner::install(builder);
    let builder = reception::install(builder);
    let builder = picking::install(builder);
    returns::install(builder)
}

#[cfg(test)]
mod tests {
    use crate::header::HEADER_WIDTH;
    use crate::registry::GrammarRegistry;
    use std::collections::HashSet;

    #[test]
    fn test_every_grammar_starts_with_header() {
        let registry = GrammarRegistry::builtin();
        for record_type in registry.record_types() {
            let grammar = registry.grammar(record_type).unwrap();
            let header_width: usize = grammar.fields.iter().take(5).map(|f| f.width).sum();
            assert_eq!(header_width, HEADER_WIDTH, "{record_type}");
            let satzart = grammar.fields[4].default.as_deref().unwrap();
            assert_eq!(satzart.len(), 9, "{record_type}");
            assert!(satzart.starts_with(record_type), "{record_type}");
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        let registry = GrammarRegistry::builtin();
        for record_type in registry.record_types() {
            let grammar = registry.grammar(record_type).unwrap();
            let names: HashSet<&str> = grammar.fields.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names.len(), grammar.fields.len(), "{record_type}");
        }
    }

    #[test]
    fn test_every_conversion_target_has_output_grammar() {
        let registry = GrammarRegistry::builtin();
        for source in registry.conversion_sources() {
            assert!(registry.contains(source), "{source}");
            for target in registry.conversion_targets(source).unwrap() {
                assert!(registry.output_grammar(target).is_some(), "{target}");
            }
        }
    }

    #[test]
    fn test_picking_links() {
        let registry = GrammarRegistry::builtin();
        assert_eq!(
            registry.conversion_targets("AUSK").unwrap(),
            ["AUSKQ".to_string(), "WATEKQ".to_string()]
        );
        assert!(registry.is_parent_key("WATEKQ", "IvTek_TeId"));
        assert_eq!(registry.parent_key_for("WATEPQ", "IvTep_TeId"), Some("IvTek_TeId"));
        assert!(registry.tolerance().allows_off_by_one("WATEKQ"));
        assert!(registry.grammar("WATEPQ").unwrap().field("IvTep_ArtBez").is_some());
    }
}
