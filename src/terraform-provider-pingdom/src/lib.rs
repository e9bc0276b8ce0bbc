//! Process bootstrap for the Pingdom provider plugin.

use provider_core::ProviderFunc;
use provider_plugin::ServeOpts;

/// Hand `provider_func` to `serve` and return whatever it returns.
///
/// `serve` is called exactly once. With the async `provider_plugin::serve` the
/// returned future runs the plugin for the life of the process. Nothing is
/// validated, logged or printed here.
pub fn run<S, R>(serve: S, provider_func: ProviderFunc) -> R
where
    S: FnOnce(ServeOpts) -> R,
{
    serve(ServeOpts { provider_func })
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_core::{Attribute, Block, Provider, ProviderResult, ProviderSchema, Schema};
    use serde_json::Value;
    use std::cell::Cell;

    struct Stub;

    impl Provider for Stub {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new(Schema::v0(
                Block::new().with_attribute("stub_marker", Attribute::optional_string()),
            ))
        }

        fn configure(&self, _terraform_version: &str, _config: &Value) -> ProviderResult<()> {
            Ok(())
        }
    }

    fn stub() -> Box<dyn Provider> {
        Box::new(Stub)
    }

    #[test]
    fn serve_called_once_with_factory() {
        let calls = Cell::new(0);
        run(
            |opts: ServeOpts| {
                calls.set(calls.get() + 1);
                let provider = (opts.provider_func)();
                assert!(provider
                    .schema()
                    .provider
                    .block
                    .attributes
                    .contains_key("stub_marker"));
            },
            stub,
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn serve_result_returned_unchanged() {
        let result: Result<(), &str> = run(|_opts| Err("host went away"), stub);
        assert_eq!(result, Err("host went away"));
    }

    #[test]
    fn factory_not_invoked_by_bootstrap() {
        thread_local! {
            static BUILT: Cell<u32> = const { Cell::new(0) };
        }

        fn counting() -> Box<dyn Provider> {
            BUILT.with(|b| b.set(b.get() + 1));
            Box::new(Stub)
        }

        run(|_opts| (), counting);
        assert_eq!(BUILT.with(Cell::get), 0);
    }
}
