use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::time::Instant;

use super::ScanUpload;
use crate::{
    api::traits::ScanBackend,
    protocol::{
        types::{NutriScore, Nutrients, Scan, ScanStatus},
        ApiError,
    },
};

pub fn scan_with_status(id: &str, status: ScanStatus) -> Scan {
    Scan {
        id: id.to_string(),
        user_id: Some("u1".to_string()),
        barcode: None,
        status,
        image_url: None,
        serving_size: None,
        nutri_score: None,
        nutri_score_value: None,
        nutrients: None,
        highlights: None,
        insights: None,
        processing_time_ms: None,
        error_message: None,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

pub fn completed_scan(id: &str, score: NutriScore) -> Scan {
    let mut scan = scan_with_status(id, ScanStatus::Completed);
    scan.nutri_score = Some(score);
    scan.nutrients = Some(Nutrients {
        energy_kcal: Some(250.0),
        sugars: Some(12.5),
        ..Default::default()
    });
    scan
}

type Reply = Result<Scan, (u16, String)>;

/// Backend double that answers fetches from a script and records call times
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Scan>,
    created: Option<Reply>,
    create_calls: Mutex<u32>,
    fetch_times: Mutex<Vec<Instant>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Reply used once the script runs out
    pub fn with_fallback(mut self, scan: Scan) -> Self {
        self.fallback = Some(scan);
        self
    }

    pub fn with_created(mut self, scan: Scan) -> Self {
        self.created = Some(Ok(scan));
        self
    }

    pub fn with_create_error(mut self, status: u16, message: &str) -> Self {
        self.created = Some(Err((status, message.to_string())));
        self
    }

    pub fn create_calls(&self) -> u32 {
        *self.create_calls.lock()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_times.lock().len()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetch_times.lock().clone()
    }
}

fn into_result(reply: Reply) -> Result<Scan, ApiError> {
    reply.map_err(|(status, message)| ApiError::Server { status, message })
}

#[async_trait]
impl ScanBackend for ScriptedBackend {
    async fn create_scan(&self, _upload: &ScanUpload) -> Result<Scan, ApiError> {
        *self.create_calls.lock() += 1;
        match &self.created {
            Some(reply) => into_result(reply.clone()),
            None => Ok(scan_with_status("s1", ScanStatus::Processing)),
        }
    }

    async fn fetch_scan(&self, scan_id: &str) -> Result<Scan, ApiError> {
        self.fetch_times.lock().push(Instant::now());
        let next = self.replies.lock().pop_front();
        match next {
            Some(reply) => into_result(reply),
            None => match &self.fallback {
                Some(scan) => Ok(scan.clone()),
                None => Err(ApiError::Server {
                    status: 404,
                    message: format!("Scan {scan_id} not found"),
                }),
            },
        }
    }
}
