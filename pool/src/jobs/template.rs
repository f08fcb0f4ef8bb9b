/// Template notification parsing
///
/// The job maker publishes one JSON object per template:
/// `{"jobId":..,"nodeJobId":..,"height":..,"prePow":"<hex>","difficulty":..}`.
/// Any defect in the notification drops it without touching the job table.

use serde::Deserialize;

use super::job::Job;
use crate::chain::ChainPow;
use crate::error::{PoolError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTemplate {
    pub job_id: u64,
    pub node_job_id: u64,
    pub height: u64,
    pub pre_pow: String,
    pub difficulty: u64,
}

impl RawTemplate {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| PoolError::MalformedTemplate(e.to_string()))
    }

    pub fn into_job<C: ChainPow>(self) -> Result<Job<C>> {
        let clean = self.pre_pow.trim().trim_start_matches("0x");
        let bytes = hex::decode(clean)
            .map_err(|e| PoolError::MalformedTemplate(format!("prePow: {}", e)))?;
        let header = C::decode_header(&bytes)?;

        let header_height = C::header_height(&header);
        if header_height != self.height {
            return Err(PoolError::MalformedTemplate(format!(
                "height {} does not match prePow height {}",
                self.height, header_height
            )));
        }
        if self.difficulty == 0 {
            return Err(PoolError::MalformedTemplate("network difficulty is zero".to_string()));
        }

        let secondary_scaling = C::secondary_scaling(&header);
        Ok(Job {
            job_id: self.job_id,
            node_job_id: self.node_job_id,
            height: self.height,
            header,
            network_difficulty: self.difficulty,
            secondary_scaling,
        })
    }
}

pub fn parse_template<C: ChainPow>(raw: &[u8]) -> Result<Job<C>> {
    RawTemplate::from_slice(raw)?.into_job()
}
