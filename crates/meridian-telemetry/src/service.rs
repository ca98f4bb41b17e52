// Copyright 2025 eraflo
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

//! Service hosting the meter registry and self-diagnostics.

use crate::config::TelemetryConfig;
use crate::error::ConfigError;
use crate::metrics::{MeterBuilder, MeterFactory};
use meridian_core::event::EventSourceRegistry;
use meridian_diagnostics::SelfDiagnostics;
use std::sync::Arc;

/// Service hosting the meter registry and self-diagnostics.
#[derive(Debug)]
pub struct TelemetryService {
    config: TelemetryConfig,
    builder: MeterBuilder,
    registry: Arc<EventSourceRegistry>,
    factory: Option<MeterFactory>,
    diagnostics: Option<SelfDiagnostics>,
}

impl TelemetryService {
    /// Creates a stopped service on the process-wide event registry.
    ///
    /// The collection interval of `config` overrides the one set on
    /// `builder`.
    pub fn new(config: TelemetryConfig, builder: MeterBuilder) -> Self {
        Self::with_registry(config, builder, EventSourceRegistry::global())
    }

    /// Creates a stopped service on a specific event registry.
    pub fn with_registry(
        config: TelemetryConfig,
        builder: MeterBuilder,
        registry: Arc<EventSourceRegistry>,
    ) -> Self {
        Self {
            config,
            builder,
            registry,
            factory: None,
            diagnostics: None,
        }
    }

    /// Starts self-diagnostics, if configured, then the meter registry.
    /// Calling it on a running service does nothing.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        if self.factory.is_some() {
            return Ok(());
        }
        self.config.validate()?;

        let diagnostics = match &self.config.self_diagnostics {
            Some(config) => Some(SelfDiagnostics::from_config(config, self.registry.clone())?),
            None => None,
        };

        let factory = self
            .builder
            .clone()
            .collection_interval(self.config.collection_interval())
            .event_registry(self.registry.clone())
            .build();
        let factory = match factory {
            Ok(factory) => factory,
            Err(e) => {
                if let Some(diagnostics) = diagnostics {
                    diagnostics.dispose();
                }
                return Err(e);
            }
        };

        self.diagnostics = diagnostics;
        self.factory = Some(factory);
        log::info!("Telemetry service started.");
        Ok(())
    }

    /// Shuts the meter registry down, then self-diagnostics. Does nothing if
    /// the service is not running.
    pub fn stop(&mut self) {
        let Some(factory) = self.factory.take() else {
            return;
        };
        factory.shutdown();
        if let Some(diagnostics) = self.diagnostics.take() {
            diagnostics.dispose();
        }
        log::info!("Telemetry service stopped.");
    }

    /// Whether [`start`](Self::start) succeeded and [`stop`](Self::stop)
    /// has not run since.
    pub fn is_running(&self) -> bool {
        self.factory.is_some()
    }

    /// The running meter registry.
    pub fn meter_factory(&self) -> Option<&MeterFactory> {
        self.factory.as_ref()
    }

    /// The active self-diagnostics, if configured.
    pub fn self_diagnostics(&self) -> Option<&SelfDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// The service configuration.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryService {
    fn drop(&mut self) {
        self.stop();
    }
}
