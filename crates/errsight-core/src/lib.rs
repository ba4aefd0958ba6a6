//! errsight Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ErrorEvent`, `ErrorReport`, `Analysis`, `AnalysisResult`, `IssueResult`
//! - **Identity** - `Fingerprint` and `DedupeWindow` bucketing
//! - **Sanitizer** - `PiiSanitizer` applied before any persistence or network call
//! - **Use cases** - `AnalyzeErrorUseCase`, `QuotaGate`, `CleanupReportsUseCase`, `ReconcileStaleReportsUseCase`
//! - **Port definitions** - Traits for adapters: `IReportStore`, `IReportRepository`, `ICacheStore`,
//!   `IAiAnalyzer`, `IIssueTracker`, `INotificationChannel`, `IIssueTitleGenerator`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod sanitizer;
pub mod usecases;
