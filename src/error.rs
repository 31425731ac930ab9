use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::command::CommandError;
use crate::format::Rejected;

/// Coarse category of a finished job.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    InputInvalid,
    FormatInvalid,
    AcquisitionFailed,
    LoopingFailed,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    InputInvalid(String),

    #[error("{0}")]
    FormatInvalid(Rejected),

    #[error("Error downloading audio file")]
    AcquisitionFailed(#[source] CommandError),

    #[error("Looping failed")]
    LoopingFailed(#[source] CommandError),
}

impl PipelineError {
    pub fn outcome(&self) -> Outcome {
        match self {
            PipelineError::InputInvalid(_) => Outcome::InputInvalid,
            PipelineError::FormatInvalid(_) => Outcome::FormatInvalid,
            PipelineError::AcquisitionFailed(_) => Outcome::AcquisitionFailed,
            PipelineError::LoopingFailed(_) => Outcome::LoopingFailed,
        }
    }

    /// Raw output of the external tool that failed. Server-side only.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            PipelineError::AcquisitionFailed(err) | PipelineError::LoopingFailed(err) => {
                err.diagnostic()
            }
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: Outcome,
    description: String,
}

impl ResponseError for PipelineError {
    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InputInvalid(_) | PipelineError::FormatInvalid(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::AcquisitionFailed(_) | PipelineError::LoopingFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Display never includes tool output, so it is safe to hand to clients.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.outcome(),
            description: self.to_string(),
        })
    }
}
