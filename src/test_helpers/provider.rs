use alloy::{
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::mock::Asserter,
};

/// Creates a mock provider and an asserter for testing purposes.
///
/// The provider has no fillers, so every RPC call it makes corresponds to one
/// response pushed to the asserter.
pub fn mock_provider() -> (DynProvider, Asserter) {
    let asserter = Asserter::new();
    let provider: DynProvider =
        ProviderBuilder::default().connect_mocked_client(asserter.clone()).erased();
    (provider, asserter)
}
