// The reconciliation engine: explicit state machines for the saved roster,
// weakness snapshots, search, drag/assignment, and recommendations. Each
// component exposes sync transition functions that produce jobs; gateway I/O
// runs inside spawned job tasks whose outcomes are applied back through
// token-checked `apply` functions.

pub mod assign;
pub mod recommend;
pub mod roster;
pub mod search;
pub mod weakness;
