//! # shapecast-contract — Async Function Contracts
//!
//! An [`AsyncContract`] wraps an async function in runtime validation:
//! arguments are checked (and codec-transformed) eagerly at call time,
//! the returned value is checked once the future resolves. Every
//! rejection is a [`ValidationError`], surfaced through the returned
//! future so callers handle one failure channel.
//!
//! Values are single-threaded (`Rc` containers), so enforced functions
//! produce [`LocalBoxFuture`]s rather than `Send` futures.
//!
//! ```
//! use futures::FutureExt;
//! use shapecast_contract::AsyncContract;
//! use shapecast_core::{Schema, Value};
//!
//! # futures::executor::block_on(async {
//! let increment = AsyncContract::new(vec![Schema::number()], Schema::number())
//!     .enforce(|args| {
//!         async move {
//!             match &args[0] {
//!                 Value::Number(n) => Value::Number(n + 1.0),
//!                 _ => Value::Null,
//!             }
//!         }
//!         .boxed_local()
//!     });
//!
//! let out = increment(vec![Value::from(41)]).await.unwrap();
//! assert_eq!(out, Value::from(42));
//! # });
//! ```

use futures::future::{self, FutureExt, LocalBoxFuture};

use shapecast_core::{Failure, Schema, ValidationError, Value};

/// A contract over an async function: one schema per argument, one for
/// the resolved value.
pub struct AsyncContract {
    args: Vec<Schema>,
    returns: Schema,
}

impl AsyncContract {
    pub fn new(args: Vec<Schema>, returns: Schema) -> AsyncContract {
        AsyncContract { args, returns }
    }

    /// Wrap `f` in the contract. The returned closure validates the
    /// argument count and each argument before invoking `f` (passing
    /// the validated, possibly transformed arguments through), then
    /// validates the value the future resolves to.
    pub fn enforce<F>(
        self,
        f: F,
    ) -> impl Fn(Vec<Value>) -> LocalBoxFuture<'static, Result<Value, ValidationError>>
    where
        F: Fn(Vec<Value>) -> LocalBoxFuture<'static, Value> + 'static,
    {
        let AsyncContract { args, returns } = self;
        move |supplied: Vec<Value>| {
            if supplied.len() < args.len() {
                let failure = Failure::new(format!(
                    "Expected {} arguments but only received {}",
                    args.len(),
                    supplied.len()
                ));
                return future::ready(Err(ValidationError::from(failure))).boxed_local();
            }
            let mut validated = Vec::with_capacity(supplied.len());
            for (schema, value) in args.iter().zip(&supplied) {
                match schema.validate(value) {
                    Ok(value) => validated.push(value),
                    Err(failure) => {
                        return future::ready(Err(ValidationError::from(failure))).boxed_local()
                    }
                }
            }
            // Arguments beyond the declared ones pass through unchecked.
            validated.extend(supplied.into_iter().skip(args.len()));

            let resolved = f(validated);
            let returns = returns.clone();
            async move {
                let value = resolved.await;
                returns.validate(&value).map_err(ValidationError::from)
            }
            .boxed_local()
        }
    }
}
