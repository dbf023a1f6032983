use crate::indexer::extract::Grammar;

pub fn grammar() -> Grammar {
    Grammar {
        name: "python",
        language: tree_sitter_python::LANGUAGE.into(),
        extensions: &["py"],
        function_kinds: &["function_definition"],
        class_kinds: &["class_definition"],
        name_field: "name",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::extract::{ExtractError, extract_symbols};
    use crate::model::SymbolKind;

    fn extract(source: &str) -> Result<Vec<(String, SymbolKind, usize)>, ExtractError> {
        let grammar = grammar();
        let mut parser = grammar.parser().unwrap();
        let symbols = extract_symbols(&mut parser, &grammar, source.as_bytes())?;
        Ok(symbols
            .into_iter()
            .map(|symbol| (symbol.name, symbol.kind, symbol.line))
            .collect())
    }

    #[test]
    fn extracts_functions_and_classes_in_preorder() {
        let source = r#"
class Outer:
    def method(self):
        def inner():
            pass
        return inner

    class Nested:
        pass

@decorator
def decorated():
    pass

async def fetch():
    pass
"#;
        let symbols = extract(source).unwrap();
        assert_eq!(
            symbols,
            vec![
                ("Outer".to_string(), SymbolKind::Class, 2),
                ("method".to_string(), SymbolKind::Function, 3),
                ("inner".to_string(), SymbolKind::Function, 4),
                ("Nested".to_string(), SymbolKind::Class, 8),
                ("decorated".to_string(), SymbolKind::Function, 12),
                ("fetch".to_string(), SymbolKind::Function, 15),
            ]
        );
    }

    #[test]
    fn ignores_other_node_kinds() {
        let source = "x = 1\nlambda_fn = lambda y: y\nimport os\n";
        assert!(extract(source).unwrap().is_empty());
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = extract("def broken(:\n    pass\n").unwrap_err();
        assert!(matches!(err, ExtractError::Syntax { .. }));
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let mut source = String::new();
        for depth in 0..200 {
            source.push_str(&"    ".repeat(depth));
            source.push_str(&format!("def f{depth}():\n"));
        }
        source.push_str(&"    ".repeat(200));
        source.push_str("pass\n");
        let symbols = extract(&source).unwrap();
        assert_eq!(symbols.len(), 200);
        assert_eq!(symbols[199].0, "f199");
    }
}
