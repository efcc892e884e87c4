#![allow(dead_code)]

use std::sync::Arc;

use once_cell::sync::Lazy;
use rebl::query::{Datum, MemoryConnection};
use rebl::{Context, EvalError, Evaluator, Outcome};

/// Seed data shared by the query tests.
pub static BIKES: Lazy<Datum> = Lazy::new(|| {
    serde_json::json!({
        "test": {
            "bikes": [
                {"id": 1, "brand": "Scott", "model": "Spark", "year": 2021, "specs": {"wheels": 29}},
                {"id": 2, "brand": "Trek", "model": "Fuel", "year": 2019, "specs": {"wheels": 27}},
                {"id": 3, "brand": "Scott", "model": "Genius", "year": 2023, "specs": {"wheels": 29}},
                {"id": 4, "brand": "Santa Cruz", "model": "Hightower", "year": 2022, "specs": {"wheels": 29}},
            ]
        },
        "shop": {
            "orders": []
        }
    })
});

/// A session the way the interactive shell drives one: every fragment is
/// wrapped before it is evaluated and all of them share one context.
pub struct Session {
    pub context: Context,
    evaluator: Evaluator,
}

impl Session {
    pub fn new(alternate_syntax: bool) -> Self {
        let connection = MemoryConnection::with_data("test", &BIKES).unwrap();
        Self::with_context(Context::new(Arc::new(connection)).with_alternate_syntax(alternate_syntax))
    }

    pub fn with_context(context: Context) -> Self {
        Self {
            context,
            evaluator: Evaluator::new(),
        }
    }

    pub async fn eval(&mut self, fragment: &str) -> Result<Outcome, EvalError> {
        let wrapped = format!("({}\n)", fragment);
        self.evaluator
            .evaluate(&wrapped, &mut self.context, "repl")
            .await
    }

    /// Evaluate and return the outcome as JSON, `null` for empty outcomes.
    pub async fn json(&mut self, fragment: &str) -> Datum {
        match self.eval(fragment).await {
            Ok(outcome) => match outcome.into_value() {
                Some(value) => serde_json::to_value(&value).unwrap(),
                None => Datum::Null,
            },
            Err(EvalError::Runtime(err)) => {
                panic!("{:?} failed: {}", fragment, err.stack_trace())
            }
            Err(err) => panic!("{:?} failed: {}", fragment, err),
        }
    }

    /// Evaluate something that must fail and return the error message.
    pub async fn error(&mut self, fragment: &str) -> String {
        match self.eval(fragment).await {
            Ok(outcome) => panic!("{:?} unexpectedly gave {:?}", fragment, outcome),
            Err(err) => err.to_string(),
        }
    }
}

/// Run a list of fragments through one fresh session and compare the JSON
/// form of each result.
#[macro_export]
macro_rules! session_test {
    ($name:ident, terse: $terse:expr, steps: [$(($input:expr, $expected:tt)),* $(,)?] $(,)?) => {
        #[tokio::test]
        async fn $name() {
            let mut session = $crate::cases::Session::new($terse);
            $(
                pretty_assertions::assert_eq!(
                    session.json($input).await,
                    serde_json::json!($expected),
                    "evaluating {:?}",
                    $input
                );
            )*
        }
    };
    ($name:ident, steps: [$(($input:expr, $expected:tt)),* $(,)?] $(,)?) => {
        $crate::session_test!($name, terse: false, steps: [$(($input, $expected)),*]);
    };
}
