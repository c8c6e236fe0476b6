// handlers/mod.rs - two security tiers
//
// Public (no auth) and Protected (JWT auth, see middleware::auth).
// The protected tier is only reachable after the auth gate has injected
// an AuthUser extension into the request.
pub mod extract;
pub mod protected;
pub mod public;
