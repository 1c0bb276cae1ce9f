//! # Repository Module
//!
//! Database repository implementations for MiniCRM.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller (HTTP layer, import binary, tests)                             │
//! │       │                                                                 │
//! │       │  db.orders().create(&input)                                    │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── create(&self, input)        ← the transactional workflow         │
//! │  ├── update_status(&self, id, s)                                       │
//! │  ├── get_detail(&self, id)                                             │
//! │  └── list(&self, filter)                                               │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Can swap database implementations                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer CRUD, dedup lookups, merge apply
//! - [`product::ProductRepository`] - Product CRUD and stock reservation
//! - [`order::OrderRepository`] - Order workflow, status transitions, listing

pub mod customer;
pub mod order;
pub mod product;
