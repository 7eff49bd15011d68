// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-aquapi project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Inter-process command pipe configuration

use serde::{Deserialize, Serialize};

/// Location of the named pipe used by the web server to pause/resume the controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    pub pipe_path: String,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            pipe_path: "server_controller.ipc".to_string(),
        }
    }
}
