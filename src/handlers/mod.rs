// handlers/mod.rs - Two-tier handler layout
//
// Public (no session) → Protected (session middleware on every route)
//
// Protected handlers receive `Extension<SessionUser>` and build every store
// query through an owner-scoped repository.
pub mod protected;
pub mod public;
