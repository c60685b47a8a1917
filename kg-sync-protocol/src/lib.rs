//! Shared data types for the knowledge-graph search synchronization pipeline.
//!
//! This crate defines the vocabulary spoken between the graph-query service,
//! the translators and the search document store. These types are used by:
//!
//! - The synchronization service (orchestrator, sanitizer, index lifecycle)
//! - Per-entity-type translators (target document contract)
//! - The HTTP entry points (error report payloads, stage parsing)
//!
//! # Overview
//!
//! - [`Stage`]: the two lifecycle stages a record can be indexed under
//! - [`index`]: physical index naming per stage, type and kind
//! - [`InternalReference`] + [`HasReferences`]: links between documents and
//!   the visitor used to walk them
//! - [`TargetDocument`]: what a translator produces
//! - [`ErrorReport`] / [`ErrorReportResult`]: per-record failures
//! - [`SourcePage`]: one page of raw records from the graph service

mod badge;
mod document;
mod error;
pub mod index;
mod page;
mod reference;
mod report;
mod stage;

pub use badge::{Badge, BadgeCollection, BADGE_VOCAB};
pub use document::{record_identifier, ContentSignals, ReleaseInfo, TargetDocument};
pub use error::{ParseStageError, TranslationError};
pub use page::SourcePage;
pub use reference::{HasReferences, InternalReference, ReferenceContext};
pub use report::{ErrorReport, ErrorReportResult, SourceTypeErrors, TargetTypeErrors};
pub use stage::Stage;

/// Prefix used by the graph service for fully qualified instance ids.
pub const INSTANCE_IRI_PREFIX: &str = "https://kg.ebrains.eu/api/instances/";
