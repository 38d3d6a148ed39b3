//! Fuzzing-server endpoints, relative to the configured base URL

use url::Url;

/// One of the four paths the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    CaseCount,
    CaseInfo { case: u32 },
    RunCase { case: u32, agent: &'a str },
    UpdateReports { agent: &'a str },
}

impl Endpoint<'_> {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::CaseCount => "getCaseCount",
            Endpoint::CaseInfo { .. } => "getCaseInfo",
            Endpoint::RunCase { .. } => "runCase",
            Endpoint::UpdateReports { .. } => "updateReports",
        }
    }

    /// Absolute URL under `base`. Any query or fragment on `base` is dropped
    /// and a trailing `/` on its path is ignored.
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        let path = format!("{}/{}", base.path().trim_end_matches('/'), self.path());
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        match *self {
            Endpoint::CaseCount => {}
            Endpoint::CaseInfo { case } => {
                url.query_pairs_mut().append_pair("case", &case.to_string());
            }
            Endpoint::RunCase { case, agent } => {
                url.query_pairs_mut()
                    .append_pair("case", &case.to_string())
                    .append_pair("agent", agent);
            }
            Endpoint::UpdateReports { agent } => {
                url.query_pairs_mut().append_pair("agent", agent);
            }
        }

        url
    }
}
