//! Request/approval workflow.

pub mod service;

pub use service::{
    ApprovalService, CreateAvailabilityInput, ReviewDecision, ReviewInput, SubmitRequestInput,
};
