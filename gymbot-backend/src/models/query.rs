/// A synthesized read query plus the user it was generated for.
///
/// Lives for exactly one request. The synthesizer is instructed to
/// scope the query to `user_id`, but the executor re-checks every
/// safety property before the query may touch the store.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub user_id: String,
    pub sql: String,
}
