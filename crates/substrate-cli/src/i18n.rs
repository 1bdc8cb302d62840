// crates/substrate-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Substrate CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - Variants are stable for CLI parsing and catalog lookup.
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Attempts to parse a locale value (case-insensitive, tolerant of region tags).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let normalized = value.to_ascii_lowercase();
        let lang = normalized.split(['-', '_']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "ca" => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
///
/// # Invariants
/// - Ordering is stable for deterministic presentation.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
///
/// # Invariants
/// - `key` matches a placeholder name without braces (for example, `path`).
/// - `value` is preformatted and should be safe for display.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static English catalog entries loaded into the localized message bundle.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "substrate {version}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("serve.config.load_failed", "Failed to load config: {error}"),
    ("serve.boot_failed", "Failed to start: {error}"),
    ("serve.missing_route", "Startup validator refused to serve: missing route for resource_kind={resource_kind}"),
    ("serve.forbidden_backend", "Startup validator refused to serve: backend {backend_type} is forbidden for resource_kind={resource_kind}"),
    ("serve.registry_unavailable", "Startup validator refused to serve: routing registry unavailable: {detail}"),
    ("serve.failed", "Server failed: {error}"),
    ("serve.listening", "Listening on {bind}"),
    ("routes.config.load_failed", "Failed to load config: {error}"),
    ("routes.store.open_failed", "Failed to open store: {error}"),
    ("routes.list.header", "Routes for tenant={tenant_id}:"),
    ("routes.list.none", "No routes found."),
    (
        "routes.list.entry",
        "- {resource_kind} env={env} project={project_id} backend={backend_type} required={required}",
    ),
    ("routes.list.failed", "Failed to list routes: {error}"),
    ("routes.set.failed", "Failed to set route: {error}"),
    ("routes.set.backend_forbidden", "Backend {backend_type} is forbidden for resource_kind={resource_kind} under mode={mode}"),
    ("routes.set.ok", "Route set: {resource_kind} tenant={tenant_id} env={env} backend={backend_type}"),
    ("routes.switch.not_found", "No existing route for resource_kind={resource_kind} tenant={tenant_id} env={env}"),
    ("routes.switch.failed", "Failed to switch route: {error}"),
    ("routes.switch.ok", "Route switched: {resource_kind} tenant={tenant_id} env={env} {previous} -> {backend_type}"),
    ("routes.project.none", "-"),
];

/// Static Catalan catalog entries loaded into the localized message bundle.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "substrate {version}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
    ("output.stream.stdout", "sortida estàndard"),
    ("output.stream.stderr", "sortida d'error"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("serve.config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("serve.boot_failed", "No s'ha pogut arrencar: {error}"),
    ("serve.missing_route", "El validador d'arrencada ha refusat servir: falta una ruta per a resource_kind={resource_kind}"),
    ("serve.forbidden_backend", "El validador d'arrencada ha refusat servir: el backend {backend_type} no és permès per a resource_kind={resource_kind}"),
    ("serve.registry_unavailable", "El validador d'arrencada ha refusat servir: registre de rutes no disponible: {detail}"),
    ("serve.failed", "El servidor ha fallat: {error}"),
    ("serve.listening", "Escoltant a {bind}"),
    ("routes.config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("routes.store.open_failed", "No s'ha pogut obrir l'emmagatzematge: {error}"),
    ("routes.list.header", "Rutes per al tenant={tenant_id}:"),
    ("routes.list.none", "No s'ha trobat cap ruta."),
    (
        "routes.list.entry",
        "- {resource_kind} env={env} projecte={project_id} backend={backend_type} requerit={required}",
    ),
    ("routes.list.failed", "No s'han pogut llistar les rutes: {error}"),
    ("routes.set.failed", "No s'ha pogut definir la ruta: {error}"),
    ("routes.set.backend_forbidden", "El backend {backend_type} no és permès per a resource_kind={resource_kind} sota mode={mode}"),
    ("routes.set.ok", "Ruta definida: {resource_kind} tenant={tenant_id} env={env} backend={backend_type}"),
    ("routes.switch.not_found", "No existeix cap ruta per a resource_kind={resource_kind} tenant={tenant_id} env={env}"),
    ("routes.switch.failed", "No s'ha pogut canviar la ruta: {error}"),
    ("routes.switch.ok", "Ruta canviada: {resource_kind} tenant={tenant_id} env={env} {previous} -> {backend_type}"),
    ("routes.project.none", "-"),
];

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let locale = current_locale();
    let template = catalog_for(locale)
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
