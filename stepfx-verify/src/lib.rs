//! Deterministic protocol verification for stepfx procedures.
//!
//! A [`Script`] declares, in order, every command a procedure is expected
//! to suspend on and the outcome to inject for it, followed by the
//! expected terminal value or failure. [`Verifier`] runs the procedure
//! through the ordinary drive loop with a scripted [`Perform`] stub in
//! place of real handlers and reports the first deviation as a
//! [`ProtocolViolation`].
//!
//! ```
//! use serde_json::json;
//! use stepfx::{Command, Resume, Step, from_fn, procedure};
//! use stepfx_verify::{Script, verify};
//!
//! let names = procedure("names", |_args| {
//!     let mut started = false;
//!     from_fn(move |input: Resume| {
//!         if !started {
//!             started = true;
//!             return Step::command(Command::new("httpGet").with("url", "/people"));
//!         }
//!         input.into_result().map(|v| v["results"][0]["name"].clone()).into()
//!     })
//! });
//!
//! let script = Script::args(json!([]))
//!     .yield_cmd(Command::new("httpGet").with("url", "/people"))
//!     .yield_returns(json!({"results": [{"name": "Luke"}]}))
//!     .returns(json!("Luke"));
//!
//! # tokio_test(async {
//! verify(names.as_ref(), &script).await.unwrap();
//! # });
//! # fn tokio_test<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```
//!
//! Violations are assertion failures of the procedure's declared
//! contract. They never reach the computation and are never recoverable.
//!
//! [`Perform`]: stepfx_runtime::Perform

#![deny(missing_docs)]

mod diff;
mod script;
mod verifier;
mod violation;

pub use diff::{Mismatch, diff, structurally_equal};
pub use script::{Expectation, Script, Terminal};
pub use verifier::{ScriptedEffects, Verifier, assert_protocol, verify, verify_with};
pub use violation::ProtocolViolation;
