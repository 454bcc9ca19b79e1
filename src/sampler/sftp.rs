// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SFTP sampler: connect, run one sftp action, disconnect.

use async_trait::async_trait;
use tracing::debug;

use super::result::{ResultAssembler, SampleResult};
use super::Sampler;
use crate::executor::{FileTransferExecutor, TransferRequest};
use crate::ssh::{ConnectionParams, CredentialResponder, SessionManager};

pub const DEFAULT_SFTP_SAMPLER_NAME: &str = "SSH SFTP Sampler";

pub struct SftpSampler {
    name: String,
    params: ConnectionParams,
    credentials: CredentialResponder,
    request: TransferRequest,
    sessions: SessionManager,
    executor: FileTransferExecutor,
}

impl SftpSampler {
    pub fn new(params: ConnectionParams, request: TransferRequest) -> Self {
        Self::with_session_manager(params, request, SessionManager::with_russh())
    }

    pub fn with_session_manager(
        params: ConnectionParams,
        request: TransferRequest,
        sessions: SessionManager,
    ) -> Self {
        let credentials = CredentialResponder::from_params(&params);
        Self {
            name: DEFAULT_SFTP_SAMPLER_NAME.to_string(),
            params,
            credentials,
            request,
            sessions,
            executor: FileTransferExecutor::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn request(&self) -> &TransferRequest {
        &self.request
    }
}

#[async_trait]
impl Sampler for SftpSampler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sample(&self) -> SampleResult {
        let assembler = ResultAssembler::new(&self.name, &self.params, self.request.describe());

        let mut session = None;
        let outcome = match self.sessions.connect(&self.params, &self.credentials).await {
            Ok(connected) => {
                let live = session.insert(connected);
                self.executor.execute(Ok(live.as_mut()), &self.request).await
            }
            Err(failure) => self.executor.execute(Err(&failure), &self.request).await,
        };
        self.sessions.disconnect(&mut session).await;

        debug!("{} finished with code {}", self.name, outcome.response_code);
        assembler.assemble(outcome)
    }
}
