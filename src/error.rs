use thiserror::Error;

/// Failure talking to the statistics API.
///
/// This is the only error kind the library produces. The variants carry
/// detail for logs; callers are expected to treat any of them as "the data
/// could not be fetched" and surface the message.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Transport failure: DNS, connect, TLS, timeout.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("request to {url} failed with HTTP {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The body was not the JSON shape we expected.
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Neither the name nor the resolved ISO-2 code produced a timeline.
    #[error("no historical timeline available for {country}")]
    MissingTimeline { country: String },

    /// At least one request of a batch failed; the batch has no partial result.
    #[error("failed to fetch {} of {total} countries ({}): {first}", .failed.len(), .failed.join(", "))]
    Batch {
        total: usize,
        failed: Vec<String>,
        first: Box<NetworkError>,
    },

    /// A request worker panicked before producing a result.
    #[error("request worker for {country} panicked")]
    WorkerPanicked { country: String },
}

impl NetworkError {
    /// `true` when the API reported the requested resource as unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NetworkError::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_message_names_every_failure() {
        let err = NetworkError::Batch {
            total: 5,
            failed: vec!["Atlantis".into(), "Narnia".into()],
            first: Box::new(NetworkError::Status {
                url: "https://example.test/countries/Atlantis".into(),
                status: 404,
                message: "Country not found".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 5"));
        assert!(msg.contains("Atlantis, Narnia"));
        assert!(msg.contains("HTTP 404"));
    }

    #[test]
    fn only_404_counts_as_not_found() {
        let not_found = NetworkError::Status {
            url: "u".into(),
            status: 404,
            message: String::new(),
        };
        let server = NetworkError::Status {
            url: "u".into(),
            status: 502,
            message: String::new(),
        };
        assert!(not_found.is_not_found());
        assert!(!server.is_not_found());
        assert!(!NetworkError::MissingTimeline { country: "X".into() }.is_not_found());
    }
}
