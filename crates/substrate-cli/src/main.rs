// crates/substrate-cli/src/main.rs
// ============================================================================
// Module: Substrate CLI Entry Point
// Description: Operator-facing binary exposing `serve` and `routes`.
// Purpose: Load configuration, run the startup validator, and either bind
//          the HTTP listener or manage the routing registry directly.
// Dependencies: clap, tokio, substrate-server, substrate-core,
//               substrate-store-sqlite, substrate-adapters
// ============================================================================

//! ## Overview
//! `serve` is a thin wrapper over [`substrate_server::router::serve`]: it
//! loads [`substrate_server::SubstrateConfig`], then serves until killed,
//! translating every boot failure into a fail-fast process exit with a
//! stderr message naming the offending resource kind when the Startup
//! Validator is the cause. `routes` talks to the routing registry directly
//! through `substrate-store-sqlite`, out of band from any running server,
//! for operators who need to seed or repair routes before a process will
//! even boot.

// ============================================================================
// SECTION: Imports
// ============================================================================

mod i18n;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use substrate_adapters::ensure_backend_allowed;
use substrate_core::Env;
use substrate_core::Mode;
use substrate_core::ResourceKind;
use substrate_core::ResourceRoute;
use substrate_core::RouteFilters;
use substrate_core::RoutingRegistryStore;
use substrate_core::core::identifiers::RouteId;
use substrate_core::core::identifiers::TenantId;
use substrate_core::core::time::Timestamp;
use substrate_server::SubstrateConfig;
use substrate_server::router;
use substrate_server::startup::StartupValidationError;
use substrate_store_sqlite::SqliteStoreConfig;
use substrate_store_sqlite::SqliteSubstrateStore;

use crate::i18n::Locale;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

const LANG_ENV: &str = "SUBSTRATE_LANG";

/// The substrate operator CLI.
#[derive(Debug, Parser)]
#[command(name = "substrate", version, disable_help_subcommand = true)]
struct Cli {
    /// Force a display locale (`en` or `ca`); defaults to `SUBSTRATE_LANG`.
    #[arg(long, global = true, value_name = "LOCALE")]
    lang: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command families.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Load configuration, run the startup validator, and serve HTTP traffic.
    Serve(ServeCommand),
    /// Manage the routing registry directly against the configured store.
    Routes {
        #[command(subcommand)]
        command: RoutesCommand,
    },
}

/// Arguments for `substrate serve`.
#[derive(Debug, Args)]
struct ServeCommand {
    /// Path to a configuration file; defaults to `SUBSTRATE_CONFIG` or `substrate.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Subcommands under `substrate routes`.
#[derive(Debug, Subcommand)]
enum RoutesCommand {
    /// List routes visible to a tenant.
    List(RoutesListCommand),
    /// Upsert a route for a resource kind.
    Set(RoutesSetCommand),
    /// Switch an existing route's backend type.
    Switch(RoutesSwitchCommand),
}

/// Arguments shared by every `routes` subcommand for locating the store.
#[derive(Debug, Args)]
struct StoreArgs {
    /// Path to a configuration file providing the SQLite store location.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `substrate routes list`.
#[derive(Debug, Args)]
struct RoutesListCommand {
    #[command(flatten)]
    store: StoreArgs,
    /// Tenant to list routes for.
    #[arg(long)]
    tenant_id: String,
    /// Restrict the listing to one resource kind.
    #[arg(long)]
    resource_kind: Option<String>,
}

/// Arguments for `substrate routes set`.
#[derive(Debug, Args)]
struct RoutesSetCommand {
    #[command(flatten)]
    store: StoreArgs,
    /// Resource kind the route resolves.
    #[arg(long)]
    resource_kind: String,
    /// Tenant the route is scoped to.
    #[arg(long)]
    tenant_id: String,
    /// Environment the route is scoped to.
    #[arg(long)]
    env: String,
    /// Mode used to validate the backend class guard.
    #[arg(long, default_value = "saas")]
    mode: String,
    /// Backend type identifier (e.g. `s3`, `sqlite`, `filesystem`).
    #[arg(long)]
    backend_type: String,
    /// Whether the startup validator should require this route.
    #[arg(long)]
    required: bool,
}

/// Arguments for `substrate routes switch`.
#[derive(Debug, Args)]
struct RoutesSwitchCommand {
    #[command(flatten)]
    store: StoreArgs,
    /// Resource kind the route resolves.
    #[arg(long)]
    resource_kind: String,
    /// Tenant the route is scoped to.
    #[arg(long)]
    tenant_id: String,
    /// Environment the route is scoped to.
    #[arg(long)]
    env: String,
    /// Mode used to validate the backend class guard.
    #[arg(long, default_value = "saas")]
    mode: String,
    /// New backend type identifier.
    #[arg(long)]
    backend_type: String,
    /// Operator-facing note on why the switch happened.
    #[arg(long)]
    switch_rationale: Option<String>,
}

// ============================================================================
// SECTION: CLI Error
// ============================================================================

/// An error surfaced to the operator as a non-zero exit with a stderr message.
#[derive(Debug)]
struct CliError {
    message: String,
}

impl CliError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    resolve_locale(cli.lang.as_deref());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => return emit_error(&err.to_string()),
    };

    match runtime.block_on(run(cli.command)) {
        Ok(code) => code,
        Err(err) => emit_error(&err.message),
    }
}

async fn run(command: Commands) -> CliResult<ExitCode> {
    match command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::Routes { command } => command_routes(command),
    }
}

fn resolve_locale(flag: Option<&str>) {
    let raw = flag.map(str::to_owned).or_else(|| std::env::var(LANG_ENV).ok());
    let Some(raw) = raw else {
        return;
    };
    match Locale::parse(&raw) {
        Some(locale) => i18n::set_locale(locale),
        None => {
            write_stderr_line(&t!("i18n.lang.invalid_env", env = LANG_ENV, value = raw));
        }
    }
}

// ============================================================================
// SECTION: serve
// ============================================================================

async fn command_serve(args: ServeCommand) -> CliResult<ExitCode> {
    let config = SubstrateConfig::load(args.config.as_deref()).map_err(|err| CliError::new(t!("serve.config.load_failed", error = err)))?;
    write_stdout_line(&t!("serve.listening", bind = config.server.bind.clone()));
    if let Err(err) = router::serve(&config).await {
        return Err(CliError::new(startup_failure_message(&err)));
    }
    Ok(ExitCode::SUCCESS)
}

fn startup_failure_message(err: &router::ServeError) -> String {
    if let router::ServeError::Boot(boot_err) = err {
        if let substrate_server::BootError::Startup(startup_err) = boot_err {
            return match startup_err {
                StartupValidationError::MissingRoute(resource_kind) => t!("serve.missing_route", resource_kind = resource_kind.as_str()),
                StartupValidationError::ForbiddenBackendClass { resource_kind, backend_type, .. } => {
                    t!("serve.forbidden_backend", resource_kind = resource_kind.as_str(), backend_type = backend_type.clone())
                }
                StartupValidationError::RegistryUnavailable(detail) => t!("serve.registry_unavailable", detail = detail.clone()),
            };
        }
    }
    t!("serve.failed", error = err)
}

// ============================================================================
// SECTION: routes
// ============================================================================

fn command_routes(command: RoutesCommand) -> CliResult<ExitCode> {
    match command {
        RoutesCommand::List(args) => routes_list(args),
        RoutesCommand::Set(args) => routes_set(args),
        RoutesCommand::Switch(args) => routes_switch(args),
    }
}

fn open_store(config_path: Option<&std::path::Path>) -> CliResult<SqliteSubstrateStore> {
    let config = SubstrateConfig::load(config_path).map_err(|err| CliError::new(t!("routes.config.load_failed", error = err)))?;
    open_store_config(&config.sqlite)
}

fn open_store_config(config: &SqliteStoreConfig) -> CliResult<SqliteSubstrateStore> {
    SqliteSubstrateStore::open(config).map_err(|err| CliError::new(t!("routes.store.open_failed", error = err)))
}

fn parse_resource_kind(raw: &str) -> CliResult<ResourceKind> {
    match raw {
        "object_store" => Ok(ResourceKind::ObjectStore),
        "event_stream" => Ok(ResourceKind::EventStream),
        "tabular_store" => Ok(ResourceKind::TabularStore),
        "metrics_store" => Ok(ResourceKind::MetricsStore),
        "memory_store" => Ok(ResourceKind::MemoryStore),
        "blackboard_store" => Ok(ResourceKind::BlackboardStore),
        "analytics_store" => Ok(ResourceKind::AnalyticsStore),
        "routing_registry" => Ok(ResourceKind::RoutingRegistry),
        other => Err(CliError::new(format!("unknown resource_kind: {other}"))),
    }
}

fn parse_env(raw: &str) -> CliResult<Env> {
    Env::parse(raw).ok_or_else(|| CliError::new(format!("unknown env: {raw}")))
}

fn parse_mode(raw: &str) -> CliResult<Mode> {
    Mode::parse(raw).ok_or_else(|| CliError::new(format!("unknown mode: {raw}")))
}

fn routes_list(args: RoutesListCommand) -> CliResult<ExitCode> {
    let store = open_store(args.store.config.as_deref())?;
    let resource_kind = args.resource_kind.as_deref().map(parse_resource_kind).transpose()?;
    let filters = RouteFilters {
        resource_kind,
        tenant_id: Some(args.tenant_id.clone()),
        env: None,
    };
    let routes = store.list_routes(&filters).map_err(|err| CliError::new(t!("routes.list.failed", error = err)))?;

    write_stdout_line(&t!("routes.list.header", tenant_id = args.tenant_id.clone()));
    if routes.is_empty() {
        write_stdout_line(&t!("routes.list.none"));
    }
    for route in &routes {
        write_stdout_line(&t!(
            "routes.list.entry",
            resource_kind = route.resource_kind.as_str(),
            env = route.env.as_str(),
            project_id = route.project_id.as_ref().map_or_else(|| t!("routes.project.none"), |id| id.as_str().to_owned()),
            backend_type = route.backend_type.clone(),
            required = route.required,
        ));
    }
    Ok(ExitCode::SUCCESS)
}

fn routes_set(args: RoutesSetCommand) -> CliResult<ExitCode> {
    let store = open_store(args.store.config.as_deref())?;
    let resource_kind = parse_resource_kind(&args.resource_kind)?;
    let env = parse_env(&args.env)?;
    let mode = parse_mode(&args.mode)?;
    ensure_backend_allowed(mode, resource_kind, &args.backend_type)
        .map_err(|_| CliError::new(t!("routes.set.backend_forbidden", resource_kind = resource_kind.as_str(), backend_type = args.backend_type.clone(), mode = mode.as_str())))?;

    let tenant_id = TenantId::parse(&args.tenant_id).map_err(|err| CliError::new(err.to_string()))?;
    let existing = store
        .get_exact_route(resource_kind, tenant_id.as_str(), env.as_str(), None)
        .map_err(|err| CliError::new(t!("routes.set.failed", error = err)))?;
    let now = Timestamp::now();
    let route = ResourceRoute {
        id: existing.as_ref().map_or_else(|| RouteId::new(generate_route_id()), |route| route.id.clone()),
        resource_kind,
        tenant_id,
        env,
        project_id: None,
        surface_id: None,
        backend_type: args.backend_type.clone(),
        config: std::collections::BTreeMap::new(),
        required: args.required,
        tier: None,
        cost_notes: None,
        health_status: None,
        previous_backend_type: existing.as_ref().map(|route| route.backend_type.clone()),
        last_switch_time: existing.is_some().then_some(now),
        switch_rationale: None,
        created_at: existing.as_ref().map_or(now, |route| route.created_at),
        updated_at: now,
    };
    let saved = store.upsert_route(route).map_err(|err| CliError::new(t!("routes.set.failed", error = err)))?;
    write_stdout_line(&t!(
        "routes.set.ok",
        resource_kind = saved.resource_kind.as_str(),
        tenant_id = saved.tenant_id.as_str().to_owned(),
        env = saved.env.as_str(),
        backend_type = saved.backend_type.clone(),
    ));
    Ok(ExitCode::SUCCESS)
}

fn routes_switch(args: RoutesSwitchCommand) -> CliResult<ExitCode> {
    let store = open_store(args.store.config.as_deref())?;
    let resource_kind = parse_resource_kind(&args.resource_kind)?;
    let env = parse_env(&args.env)?;
    let mode = parse_mode(&args.mode)?;
    ensure_backend_allowed(mode, resource_kind, &args.backend_type)
        .map_err(|_| CliError::new(t!("routes.set.backend_forbidden", resource_kind = resource_kind.as_str(), backend_type = args.backend_type.clone(), mode = mode.as_str())))?;

    let existing = store
        .get_exact_route(resource_kind, &args.tenant_id, env.as_str(), None)
        .map_err(|err| CliError::new(t!("routes.switch.failed", error = err)))?
        .ok_or_else(|| CliError::new(t!("routes.switch.not_found", resource_kind = resource_kind.as_str(), tenant_id = args.tenant_id.clone(), env = env.as_str())))?;

    let now = Timestamp::now();
    let previous_backend_type = existing.backend_type.clone();
    let route = ResourceRoute {
        previous_backend_type: Some(previous_backend_type.clone()),
        backend_type: args.backend_type.clone(),
        switch_rationale: args.switch_rationale.clone(),
        last_switch_time: Some(now),
        updated_at: now,
        ..existing
    };
    let saved = store.upsert_route(route).map_err(|err| CliError::new(t!("routes.switch.failed", error = err)))?;
    write_stdout_line(&t!(
        "routes.switch.ok",
        resource_kind = saved.resource_kind.as_str(),
        tenant_id = saved.tenant_id.as_str().to_owned(),
        env = saved.env.as_str(),
        previous = previous_backend_type,
        backend_type = saved.backend_type.clone(),
    ));
    Ok(ExitCode::SUCCESS)
}

fn generate_route_id() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

fn write_stdout_line(line: &str) {
    println!("{line}");
}

fn write_stderr_line(line: &str) {
    eprintln!("{line}");
}

fn emit_error(message: &str) -> ExitCode {
    write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn parses_known_resource_kinds() {
        assert_eq!(parse_resource_kind("event_stream").unwrap(), ResourceKind::EventStream);
        assert_eq!(parse_resource_kind("routing_registry").unwrap(), ResourceKind::RoutingRegistry);
        assert!(parse_resource_kind("not_a_kind").is_err());
    }

    #[test]
    fn parses_known_envs_and_modes() {
        assert_eq!(parse_env("staging").unwrap(), Env::Staging);
        assert!(parse_env("nowhere").is_err());
        assert_eq!(parse_mode("lab").unwrap(), Mode::Lab);
        assert!(parse_mode("bogus").is_err());
    }

    fn write_config(dir: &TempDir) -> NamedTempFile {
        let db_path = dir.path().join("substrate.db");
        let mut file = NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"
            [deployment]
            env = "dev"

            [sqlite]
            path = "{}"
            "#,
            db_path.display()
        )
        .expect("write config");
        file
    }

    #[test]
    fn routes_set_then_list_round_trips_through_sqlite() {
        let dir = TempDir::new().expect("tempdir");
        let config_file = write_config(&dir);

        let set_args = RoutesSetCommand {
            store: StoreArgs { config: Some(config_file.path().to_path_buf()) },
            resource_kind: "event_stream".to_owned(),
            tenant_id: "t_acme".to_owned(),
            env: "dev".to_owned(),
            mode: "saas".to_owned(),
            backend_type: "sqlite".to_owned(),
            required: true,
        };
        routes_set(set_args).expect("set succeeds");

        let list_args = RoutesListCommand {
            store: StoreArgs { config: Some(config_file.path().to_path_buf()) },
            tenant_id: "t_acme".to_owned(),
            resource_kind: None,
        };
        routes_list(list_args).expect("list succeeds");
    }

    #[test]
    fn routes_set_rejects_forbidden_backend_for_saas_mode() {
        let dir = TempDir::new().expect("tempdir");
        let config_file = write_config(&dir);

        let set_args = RoutesSetCommand {
            store: StoreArgs { config: Some(config_file.path().to_path_buf()) },
            resource_kind: "object_store".to_owned(),
            tenant_id: "t_acme".to_owned(),
            env: "dev".to_owned(),
            mode: "saas".to_owned(),
            backend_type: "filesystem".to_owned(),
            required: false,
        };
        let err = routes_set(set_args).unwrap_err();
        assert!(err.message.contains("filesystem") || err.message.contains("object_store"));
    }

    #[test]
    fn routes_switch_fails_when_no_existing_route() {
        let dir = TempDir::new().expect("tempdir");
        let config_file = write_config(&dir);

        let switch_args = RoutesSwitchCommand {
            store: StoreArgs { config: Some(config_file.path().to_path_buf()) },
            resource_kind: "event_stream".to_owned(),
            tenant_id: "t_acme".to_owned(),
            env: "dev".to_owned(),
            mode: "saas".to_owned(),
            backend_type: "sqlite".to_owned(),
            switch_rationale: None,
        };
        let err = routes_switch(switch_args).unwrap_err();
        assert!(err.message.to_lowercase().contains("route") || !err.message.is_empty());
    }
}
