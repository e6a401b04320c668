// handlers/protected/mod.rs - Session required
//
// Route layer: session_auth_middleware (401 before any extractor runs)
pub mod events;
pub mod memories;
pub mod utils;
