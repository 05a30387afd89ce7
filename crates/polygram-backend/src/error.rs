#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Problem {
    #[error("rule `{rule}` references undefined rule `{name}`")]
    UndefinedReference { rule: String, name: String },
    #[error("root rule `{0}` is not defined")]
    UndefinedRoot(String),
    #[error("rule `{rule}` has invalid repetition bounds {{{min},{max}}}")]
    InvalidBounds { rule: String, min: u32, max: u32 },
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),
    #[error("rule `{rule}` contains an empty text literal")]
    EmptyLiteral { rule: String },
}

/// Everything [`crate::validate`] found wrong with a grammar.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("malformed grammar{}", indented_lines(.problems))]
pub struct WellFormednessError {
    pub problems: Vec<Problem>,
}

fn indented_lines(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|problem| format!("\n  {problem}"))
        .collect()
}

/// The grammar and visitor cannot be compiled into a runtime.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Malformed(#[from] WellFormednessError),
    #[error("visitor has hooks for unknown rule `{0}`")]
    UnknownRule(String),
    #[error("rule `{rule}` references external rule `{name}` which was never provided")]
    UnresolvedExternal { rule: String, name: String },
    #[error("rule `{0}` contains an unordered choice, which cannot be compiled")]
    UnorderedChoice(String),
}

#[test]
fn test_messages() {
    let error = WellFormednessError {
        problems: vec![
            Problem::UndefinedRoot("start".into()),
            Problem::InvalidBounds {
                rule: "digits".into(),
                min: 3,
                max: 2,
            },
        ],
    };
    assert_eq!(
        error.to_string(),
        "malformed grammar\n  root rule `start` is not defined\n  rule `digits` has invalid repetition bounds {3,2}"
    );
    assert_eq!(ConfigError::from(error.clone()).to_string(), error.to_string());

    let empty = WellFormednessError { problems: vec![] };
    assert_eq!(empty.to_string(), "malformed grammar");
    let boxed: Box<dyn std::error::Error> = Box::new(empty);
    assert!(boxed.source().is_none());
}
