use crate::audit_store::SyncAuditStore;
use crate::error::McpSyncError;
use crate::models::{
    AuditEventStatus, ConnectionSpec, EnabledState, ImportReport, ProviderHealth, ProviderOutcome,
    ProviderReport, ProviderServerStatus, Registry, ServerRecord, ServerStatus, SyncReport,
    ToggleReport, WriteResult,
};
use crate::paths::{home_dir, McpSyncPaths};
use crate::provider::{all_providers, AutoConfirm, Confirmer, McpProvider, ProviderKind};
use crate::settings::SyncPreferencesStore;
use crate::unified_store::{strip_meta, UnifiedStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SyncEnvironment {
    pub home_directory: PathBuf,
}

impl SyncEnvironment {
    pub fn current() -> Result<Self, McpSyncError> {
        Self::from_home(home_dir())
    }

    fn from_home(home: Option<PathBuf>) -> Result<Self, McpSyncError> {
        let Some(home_directory) = home else {
            tracing::warn!("no home directory; provider config files cannot be located");
            return Err(McpSyncError::HomeNotFound);
        };
        Ok(Self { home_directory })
    }

    pub fn at(home_directory: impl Into<PathBuf>) -> Self {
        Self {
            home_directory: home_directory.into(),
        }
    }
}

/// Which project scopes a toggle targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSelector {
    /// Every project the provider knows, or its single global scope.
    Global,
    Projects(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ToggleRequest {
    pub enabled: bool,
    pub servers: Vec<String>,
    /// Restricts the run to one provider id.
    pub provider: Option<String>,
    pub projects: ProjectSelector,
}

pub struct SyncEngine {
    environment: SyncEnvironment,
    store: UnifiedStore,
    providers: Vec<Box<dyn McpProvider>>,
    audit: Option<SyncAuditStore>,
}

impl SyncEngine {
    /// Engine over the detected runtime directory and the user's home.
    /// Providers listed in `disabled_providers` are never constructed.
    pub fn current(confirmer: Arc<dyn Confirmer>) -> Result<Self, McpSyncError> {
        let environment = SyncEnvironment::current()?;
        let paths = McpSyncPaths::detect();
        let settings = SyncPreferencesStore::new(paths.clone()).load_settings();
        let confirmer: Arc<dyn Confirmer> = if settings.auto_confirm {
            Arc::new(AutoConfirm)
        } else {
            confirmer
        };

        let providers = all_providers(&environment.home_directory, confirmer)
            .into_iter()
            .filter(|provider| {
                let disabled = settings.is_provider_disabled(provider.id());
                if disabled {
                    tracing::debug!(provider = provider.id(), "disabled in settings");
                }
                !disabled
            })
            .collect();

        Ok(Self {
            environment,
            store: UnifiedStore::new(paths.store_path.clone()),
            providers,
            audit: Some(SyncAuditStore::new(paths, settings.audit_log_limit)),
        })
    }

    pub fn new(
        environment: SyncEnvironment,
        store: UnifiedStore,
        providers: Vec<Box<dyn McpProvider>>,
    ) -> Self {
        Self {
            environment,
            store,
            providers,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: SyncAuditStore) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn environment(&self) -> &SyncEnvironment {
        &self.environment
    }

    pub fn store(&self) -> &UnifiedStore {
        &self.store
    }

    pub fn audit(&self) -> Option<&SyncAuditStore> {
        self.audit.as_ref()
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn McpProvider> {
        self.providers.iter().map(|provider| provider.as_ref())
    }

    pub fn load_registry(&self) -> Result<Registry, McpSyncError> {
        self.store.load()
    }

    pub fn toggle(&self, request: &ToggleRequest) -> Result<ToggleReport, McpSyncError> {
        let mut registry = self.store.load()?;
        let mut report = ToggleReport {
            enabled: request.enabled,
            ..ToggleReport::default()
        };
        let names = normalized_names(&request.servers);
        if names.is_empty() {
            report.warnings.push(String::from("no server names given"));
            return Ok(report);
        }

        let mut attempted = 0usize;
        let mut failed = 0usize;
        for provider in self.select_providers(request.provider.as_deref(), &mut report.warnings) {
            if !provider.config_exists() {
                report.providers.push(skipped(provider, "no config file"));
                continue;
            }

            attempted += 1;
            match self.toggle_provider(provider, request, &names, &mut registry, &mut report) {
                Ok(provider_report) => report.providers.push(provider_report),
                Err(error) => {
                    failed += 1;
                    tracing::warn!(provider = provider.id(), %error, "provider failed");
                    report.providers.push(failure(provider, &error));
                }
            }
        }

        self.store.save(&registry)?;
        let action = if request.enabled { "enable" } else { "disable" };
        self.record_audit(
            action,
            &report.providers,
            format!("{action} {}", names.join(", ")),
        );
        ensure_some_provider_succeeded(attempted, failed)?;
        Ok(report)
    }

    pub fn sync(&self, provider: Option<&str>) -> Result<SyncReport, McpSyncError> {
        let mut registry = self.store.load()?;
        let mut report = SyncReport::default();

        let mut attempted = 0usize;
        let mut failed = 0usize;
        for provider in self.select_providers(provider, &mut report.warnings) {
            if !provider.config_exists() {
                report.providers.push(skipped(provider, "no config file"));
                continue;
            }

            attempted += 1;
            match self.sync_provider(provider, &mut registry, &mut report) {
                Ok(provider_report) => report.providers.push(provider_report),
                Err(error) => {
                    failed += 1;
                    tracing::warn!(provider = provider.id(), %error, "provider failed");
                    report.providers.push(failure(provider, &error));
                }
            }
        }

        self.store.save(&registry)?;
        self.record_audit(
            "sync",
            &report.providers,
            format!("sync {} server(s)", registry.servers.len()),
        );
        ensure_some_provider_succeeded(attempted, failed)?;
        Ok(report)
    }

    /// Copies servers the provider holds but the store lacks. Existing
    /// records are never overwritten.
    pub fn import(&self, provider_id: &str) -> Result<ImportReport, McpSyncError> {
        let kind = provider_id.parse::<ProviderKind>()?;
        let mut registry = self.store.load()?;
        let mut report = ImportReport {
            provider: kind.as_str().to_string(),
            ..ImportReport::default()
        };

        let Some(provider) = self.providers().find(|item| item.id() == kind.as_str()) else {
            report
                .warnings
                .push(format!("{} is disabled in settings", kind.as_str()));
            return Ok(report);
        };
        if !provider.config_exists() {
            report.warnings.push(format!(
                "{} has no config file at {}",
                provider.display_name(),
                provider.config_path().display()
            ));
            return Ok(report);
        }

        let outcome = self.import_from(provider, &mut registry, &mut report);
        self.store.save(&registry)?;

        let provider_report = match &outcome {
            Ok(()) => ProviderReport {
                provider: provider.id().to_string(),
                outcome: ProviderOutcome::Written(WriteResult::from_changed(
                    !report.imported.is_empty(),
                )),
                servers: report.imported.clone(),
            },
            Err(error) => failure(provider, error),
        };
        self.record_audit(
            "import",
            &[provider_report],
            format!(
                "import {} server(s) from {}",
                report.imported.len(),
                provider.id()
            ),
        );
        outcome.map(|()| report)
    }

    pub fn status(&self) -> Result<Vec<ServerStatus>, McpSyncError> {
        let registry = self.store.load()?;

        let mut listings = Vec::new();
        for provider in self.providers() {
            if !provider.config_exists() {
                continue;
            }
            match provider.list_servers() {
                Ok(servers) => listings.push((provider, servers)),
                Err(error) => {
                    tracing::warn!(provider = provider.id(), %error, "cannot read provider");
                }
            }
        }

        Ok(registry
            .servers
            .iter()
            .map(|(name, record)| ServerStatus {
                name: name.clone(),
                transport: record.spec.transport_label().to_string(),
                providers: listings
                    .iter()
                    .map(|(provider, servers)| {
                        let current = servers.get(name);
                        ProviderServerStatus {
                            provider: provider.id().to_string(),
                            installed: current.is_some(),
                            desired: record.enabled_for(provider.id()).cloned(),
                            drifted: current.map(|spec| spec != &record.spec).unwrap_or(false),
                        }
                    })
                    .collect(),
                warnings: secret_warnings(name, &record.spec),
            })
            .collect())
    }

    pub fn doctor(&self) -> Vec<ProviderHealth> {
        self.providers()
            .map(|provider| {
                let mut health = ProviderHealth {
                    provider: provider.id().to_string(),
                    display_name: provider.display_name().to_string(),
                    config_path: provider.config_path().display().to_string(),
                    config_exists: provider.config_exists(),
                    supports_disabled_state: provider.supports_disabled_state(),
                    projects: 0,
                    servers: 0,
                    error: None,
                };
                if !health.config_exists {
                    return health;
                }
                let counts = provider
                    .projects()
                    .and_then(|projects| Ok((projects.len(), provider.list_servers()?.len())));
                match counts {
                    Ok((projects, servers)) => {
                        health.projects = projects;
                        health.servers = servers;
                    }
                    Err(error) => health.error = Some(error.to_string()),
                }
                health
            })
            .collect()
    }

    fn select_providers(
        &self,
        requested: Option<&str>,
        warnings: &mut Vec<String>,
    ) -> Vec<&dyn McpProvider> {
        let Some(requested) = requested else {
            return self.providers().collect();
        };

        let kind = match requested.parse::<ProviderKind>() {
            Ok(kind) => kind,
            Err(error) => {
                tracing::warn!(%error, "unknown provider");
                warnings.push(error.to_string());
                return Vec::new();
            }
        };
        let selected: Vec<_> = self
            .providers()
            .filter(|provider| provider.id() == kind.as_str())
            .collect();
        if selected.is_empty() {
            warnings.push(format!("{} is disabled in settings", kind.as_str()));
        }
        selected
    }

    fn toggle_provider(
        &self,
        provider: &dyn McpProvider,
        request: &ToggleRequest,
        names: &[String],
        registry: &mut Registry,
        report: &mut ToggleReport,
    ) -> Result<ProviderReport, McpSyncError> {
        let id = provider.id();
        let known = provider.projects()?;

        let targets = match &request.projects {
            ProjectSelector::Global => None,
            ProjectSelector::Projects(_) if known.is_empty() => {
                tracing::warn!(provider = id, "provider has no projects; applying globally");
                report.warnings.push(format!(
                    "{} has no projects; applied globally",
                    provider.display_name()
                ));
                None
            }
            ProjectSelector::Projects(requested) => {
                let mut kept = Vec::new();
                for project in requested {
                    if known.contains(project) {
                        kept.push(project.clone());
                    } else {
                        tracing::warn!(provider = id, project = %project, "unknown project");
                        report.warnings.push(format!(
                            "{} does not know project {project}",
                            provider.display_name()
                        ));
                    }
                }
                if kept.is_empty() {
                    return Ok(skipped(provider, "none of the requested projects"));
                }
                Some(kept)
            }
        };

        let mut result = WriteResult::NoChanges;
        let mut batch = Vec::new();
        for name in names {
            let current = provider.server_config(name)?;
            if !registry.contains(name) {
                if !request.enabled {
                    tracing::warn!(server = %name, "not in unified store; nothing to disable");
                    report
                        .warnings
                        .push(format!("{name} is not in the unified store"));
                    continue;
                }
                let Some(spec) = current.clone() else {
                    tracing::warn!(provider = id, server = %name, "server not found");
                    report.warnings.push(format!(
                        "{name} is in neither the unified store nor {}",
                        provider.display_name()
                    ));
                    continue;
                };
                tracing::info!(provider = id, server = %name, "imported into unified store");
                registry
                    .servers
                    .insert(name.clone(), ServerRecord::new(spec));
                if !report.imported.contains(name) {
                    report.imported.push(name.clone());
                }
            }

            if request.enabled && current.is_none() {
                let Some(record) = registry.get(name) else {
                    continue;
                };
                match provider.install_server(name, &strip_meta(record).spec)? {
                    WriteResult::Rejected => {
                        report.warnings.push(format!(
                            "install of {name} into {} was declined",
                            provider.display_name()
                        ));
                        continue;
                    }
                    installed_result => {
                        tracing::info!(provider = id, server = %name, "installed");
                        result = result.merge(installed_result);
                    }
                }
            }
            batch.push(name.clone());
        }

        if batch.is_empty() {
            return Ok(skipped(provider, "no servers to apply"));
        }

        let snapshot: Vec<(String, Option<EnabledState>)> = batch
            .iter()
            .map(|name| {
                let prior = registry.get(name).and_then(|record| record.enabled_for(id));
                (name.clone(), prior.cloned())
            })
            .collect();
        for name in &batch {
            if let Some(record) = registry.servers.get_mut(name) {
                let next = EnabledState::toggled(
                    record.enabled_for(id),
                    &known,
                    targets.as_deref(),
                    request.enabled,
                );
                record.meta.enabled.insert(id.to_string(), next);
            }
        }

        let scopes: Vec<Option<&str>> = match &targets {
            None => vec![None],
            Some(projects) => projects.iter().map(|project| Some(project.as_str())).collect(),
        };
        let written = write_scopes(provider, &batch, &scopes, request.enabled)
            .map(|written| result.merge(written));

        match written {
            Ok(WriteResult::Rejected) => {
                tracing::warn!(provider = id, "write declined; restoring _meta");
                restore(registry, id, snapshot);
                Ok(ProviderReport {
                    provider: id.to_string(),
                    outcome: ProviderOutcome::Written(WriteResult::Rejected),
                    servers: batch,
                })
            }
            Ok(outcome) => {
                tracing::info!(provider = id, result = outcome.as_str(), "toggle applied");
                Ok(ProviderReport {
                    provider: id.to_string(),
                    outcome: ProviderOutcome::Written(outcome),
                    servers: batch,
                })
            }
            Err(error) => {
                restore(registry, id, snapshot);
                Err(error)
            }
        }
    }

    fn sync_provider(
        &self,
        provider: &dyn McpProvider,
        registry: &mut Registry,
        report: &mut SyncReport,
    ) -> Result<ProviderReport, McpSyncError> {
        let id = provider.id();
        let snapshot: Vec<(String, Option<EnabledState>)> = registry
            .servers
            .iter()
            .map(|(name, record)| (name.clone(), record.enabled_for(id).cloned()))
            .collect();

        let synced = self
            .install_missing(provider, registry, report)
            .and_then(|(installed, newly_installed)| {
                let reconciled = provider.sync_servers(registry)?;
                Ok((installed.merge(reconciled), newly_installed))
            });
        let (result, newly_installed) = match synced {
            Ok(synced) => synced,
            Err(error) => {
                restore(registry, id, snapshot);
                return Err(error);
            }
        };

        tracing::info!(provider = id, result = result.as_str(), "sync finished");
        if !newly_installed.is_empty() {
            report
                .installed
                .insert(id.to_string(), newly_installed.clone());
        }
        Ok(ProviderReport {
            provider: id.to_string(),
            outcome: ProviderOutcome::Written(result),
            servers: newly_installed,
        })
    }

    /// Installs records the provider lacks; first sightings are recorded off.
    fn install_missing(
        &self,
        provider: &dyn McpProvider,
        registry: &mut Registry,
        report: &mut SyncReport,
    ) -> Result<(WriteResult, Vec<String>), McpSyncError> {
        let id = provider.id();
        let installed = provider.list_servers()?;
        let mut result = WriteResult::NoChanges;
        let mut newly_installed = Vec::new();

        let names: Vec<String> = registry.servers.keys().cloned().collect();
        for name in names {
            if installed.contains_key(&name) {
                continue;
            }
            let Some(record) = registry.get(&name) else {
                continue;
            };
            if !provider.supports_disabled_state() && !provider.is_server_enabled_in_meta(record) {
                tracing::debug!(provider = id, server = %name, "not installing a server meant to be off");
                continue;
            }
            let first_sighting = record.enabled_for(id).is_none();

            match provider.install_server(&name, &strip_meta(record).spec)? {
                WriteResult::Rejected => {
                    report.warnings.push(format!(
                        "install of {name} into {} was declined",
                        provider.display_name()
                    ));
                    result = result.merge(WriteResult::Rejected);
                }
                installed_result => {
                    tracing::info!(provider = id, server = %name, "installed");
                    result = result.merge(installed_result);
                    if first_sighting {
                        if let Some(record) = registry.servers.get_mut(&name) {
                            record
                                .meta
                                .enabled
                                .insert(id.to_string(), EnabledState::Global(false));
                        }
                    }
                    newly_installed.push(name);
                }
            }
        }

        Ok((result, newly_installed))
    }

    fn import_from(
        &self,
        provider: &dyn McpProvider,
        registry: &mut Registry,
        report: &mut ImportReport,
    ) -> Result<(), McpSyncError> {
        let id = provider.id();
        for (name, spec) in provider.list_servers()? {
            match registry.get(&name) {
                Some(existing) if existing.spec != spec => {
                    tracing::warn!(provider = id, server = %name, "definition differs from unified store");
                    report.warnings.push(format!(
                        "{name} in {} differs from the unified store; kept the stored definition",
                        provider.display_name()
                    ));
                    report.conflicts.push(name);
                }
                Some(_) => {}
                None => {
                    report.warnings.extend(secret_warnings(&name, &spec));
                    let mut record = ServerRecord::new(spec);
                    if let Some(state) = provider.observed_state(&name)? {
                        record.meta.enabled.insert(id.to_string(), state);
                    }
                    tracing::info!(provider = id, server = %name, "imported");
                    registry.servers.insert(name.clone(), record);
                    report.imported.push(name);
                }
            }
        }
        Ok(())
    }

    fn record_audit(&self, action: &str, providers: &[ProviderReport], summary: String) {
        let Some(audit) = &self.audit else {
            return;
        };
        let details = providers
            .iter()
            .filter_map(|item| match &item.outcome {
                ProviderOutcome::Failed(error) => Some(format!("{}: {error}", item.provider)),
                _ => None,
            })
            .collect::<Vec<_>>();
        let result = audit.record(
            action,
            audit_status(providers),
            summary,
            providers.iter().map(|item| item.provider.clone()).collect(),
            (!details.is_empty()).then(|| details.join("; ")),
        );
        if let Err(error) = result {
            tracing::warn!(%error, "failed to append audit event");
        }
    }
}

/// Issues one write per scope, in order, and stops at the first rejection.
fn write_scopes(
    provider: &dyn McpProvider,
    batch: &[String],
    scopes: &[Option<&str>],
    enabled: bool,
) -> Result<WriteResult, McpSyncError> {
    let mut result = WriteResult::NoChanges;
    for scope in scopes {
        let written = if enabled {
            provider.enable_servers(batch, *scope)?
        } else {
            provider.disable_servers(batch, *scope)?
        };
        result = result.merge(written);
        if written == WriteResult::Rejected {
            break;
        }
    }
    Ok(result)
}

fn restore(registry: &mut Registry, provider: &str, snapshot: Vec<(String, Option<EnabledState>)>) {
    for (name, prior) in snapshot {
        let Some(record) = registry.servers.get_mut(&name) else {
            continue;
        };
        match prior {
            Some(state) => {
                record.meta.enabled.insert(provider.to_string(), state);
            }
            None => {
                record.meta.enabled.remove(provider);
            }
        }
    }
}

fn normalized_names(names: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !result.iter().any(|item| item == name) {
            result.push(name.to_string());
        }
    }
    result
}

fn skipped(provider: &dyn McpProvider, reason: &str) -> ProviderReport {
    tracing::debug!(provider = provider.id(), reason, "skipped");
    ProviderReport {
        provider: provider.id().to_string(),
        outcome: ProviderOutcome::Skipped(reason.to_string()),
        servers: Vec::new(),
    }
}

fn failure(provider: &dyn McpProvider, error: &McpSyncError) -> ProviderReport {
    ProviderReport {
        provider: provider.id().to_string(),
        outcome: ProviderOutcome::Failed(error.to_string()),
        servers: Vec::new(),
    }
}

fn ensure_some_provider_succeeded(attempted: usize, failed: usize) -> Result<(), McpSyncError> {
    if attempted > 0 && failed == attempted {
        return Err(McpSyncError::AllProvidersFailed(attempted));
    }
    Ok(())
}

fn audit_status(providers: &[ProviderReport]) -> AuditEventStatus {
    let attempted = providers
        .iter()
        .filter(|item| !matches!(item.outcome, ProviderOutcome::Skipped(_)))
        .count();
    let failed = providers
        .iter()
        .filter(|item| matches!(item.outcome, ProviderOutcome::Failed(_)))
        .count();
    let rejected = providers.iter().any(|item| match item.outcome {
        ProviderOutcome::Written(result) => !result.is_success(),
        _ => false,
    });

    if attempted > 0 && failed == attempted {
        AuditEventStatus::Failed
    } else if failed > 0 || rejected {
        AuditEventStatus::Partial
    } else {
        AuditEventStatus::Success
    }
}

/// Env values, args and headers that look like inline credentials.
pub fn secret_warnings(server: &str, spec: &ConnectionSpec) -> Vec<String> {
    let mut warnings = Vec::new();
    match spec {
        ConnectionSpec::Stdio { args, env, .. } => {
            for (key, value) in env {
                if is_secret_key(key) && !value.starts_with("${") {
                    warnings.push(format!(
                        "MCP server '{server}' has inline secret-like env value for '{key}'"
                    ));
                }
            }
            for arg in args {
                let lower = arg.to_ascii_lowercase();
                if (lower.contains("token=") || lower.contains("secret=") || lower.contains("api_key="))
                    && !arg.contains("${")
                {
                    warnings.push(format!(
                        "MCP server '{server}' has inline secret-like argument '{arg}'"
                    ));
                }
            }
        }
        ConnectionSpec::Remote { headers, .. } => {
            for (key, value) in headers {
                let sensitive = is_secret_key(key) || key.eq_ignore_ascii_case("authorization");
                if sensitive && !value.contains("${") {
                    warnings.push(format!(
                        "MCP server '{server}' has inline secret-like header '{key}'"
                    ));
                }
            }
        }
    }
    warnings
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    ["token", "secret", "password", "api_key"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::{audit_status, normalized_names, secret_warnings, SyncEnvironment};
    use crate::error::McpSyncError;
    use crate::models::{
        AuditEventStatus, ConnectionSpec, ProviderOutcome, ProviderReport, WriteResult,
    };
    use std::collections::BTreeMap;

    fn report(provider: &str, outcome: ProviderOutcome) -> ProviderReport {
        ProviderReport {
            provider: provider.to_string(),
            outcome,
            servers: Vec::new(),
        }
    }

    #[test]
    fn secret_warnings_ignore_variable_references() {
        let mut env = BTreeMap::new();
        env.insert(String::from("GITHUB_TOKEN"), String::from("ghp_live"));
        env.insert(String::from("API_KEY"), String::from("${API_KEY}"));
        env.insert(String::from("LOG_LEVEL"), String::from("debug"));
        let spec = ConnectionSpec::Stdio {
            command: String::from("npx"),
            args: vec![String::from("--token=abc")],
            env,
        };

        let warnings = secret_warnings("github", &spec);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("GITHUB_TOKEN"));
        assert!(warnings[1].contains("--token=abc"));
    }

    #[test]
    fn authorization_headers_are_flagged() {
        let mut headers = BTreeMap::new();
        headers.insert(String::from("Authorization"), String::from("Bearer abc"));
        let spec = ConnectionSpec::Remote {
            transport: crate::models::RemoteTransport::Http,
            url: String::from("https://a.test/mcp"),
            headers,
        };
        assert_eq!(secret_warnings("remote", &spec).len(), 1);
    }

    #[test]
    fn missing_home_is_an_error() {
        assert!(matches!(
            SyncEnvironment::from_home(None),
            Err(McpSyncError::HomeNotFound)
        ));
        let environment =
            SyncEnvironment::from_home(Some(std::path::PathBuf::from("/home/dev"))).expect("home");
        assert_eq!(environment.home_directory, std::path::PathBuf::from("/home/dev"));
    }

    #[test]
    fn normalized_names_trim_and_dedupe() {
        let names = vec![
            String::from(" fs "),
            String::from("fs"),
            String::new(),
            String::from("git"),
        ];
        assert_eq!(normalized_names(&names), vec!["fs", "git"]);
    }

    #[test]
    fn audit_status_reflects_failures_and_rejections() {
        let ok = report("claude", ProviderOutcome::Written(WriteResult::Applied));
        let skipped = report("cursor", ProviderOutcome::Skipped(String::from("no config file")));
        let failed = report("codex", ProviderOutcome::Failed(String::from("boom")));
        let rejected = report("gemini", ProviderOutcome::Written(WriteResult::Rejected));

        assert_eq!(
            audit_status(&[ok.clone(), skipped.clone()]),
            AuditEventStatus::Success
        );
        assert_eq!(
            audit_status(&[ok.clone(), failed.clone()]),
            AuditEventStatus::Partial
        );
        assert_eq!(audit_status(&[ok, rejected]), AuditEventStatus::Partial);
        assert_eq!(audit_status(&[failed, skipped]), AuditEventStatus::Failed);
    }
}
