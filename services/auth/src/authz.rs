//! Path based role authorization
//!
//! Every authenticated request is checked here before it reaches a business
//! handler, on top of whatever role checks the handlers do themselves.

use serde::Serialize;
use std::fmt;

/// Body sent with every denial
pub const DENIED_MESSAGE: &str =
    "Access denied. You do not have permission to access this module.";

/// Prefixes any authenticated caller may reach
pub const COMMON_PREFIXES: &[&str] = &[
    "/account/logout",
    "/dashboard",
    "/home",
    "/lib",
    "/css",
    "/js",
    "/favicon",
];

/// Roles known to the authorization table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AppRole {
    Administrador,
    Docente,
    Medico,
    Direccion,
}

impl AppRole {
    /// Role that bypasses the table entirely
    pub const PRIVILEGED: AppRole = AppRole::Administrador;

    pub const ALL: [AppRole; 4] = [
        AppRole::Administrador,
        AppRole::Docente,
        AppRole::Medico,
        AppRole::Direccion,
    ];

    /// Exact, case-sensitive match against a role claim
    pub fn from_claim(claim: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == claim)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Administrador => "Administrador",
            AppRole::Docente => "Docente",
            AppRole::Medico => "Medico",
            AppRole::Direccion => "Direccion",
        }
    }

    /// Policy table. The privileged role is never looked up here.
    pub fn allowed_prefixes(&self) -> &'static [&'static str] {
        match self {
            AppRole::Administrador => &[],
            AppRole::Docente => &["/calificaciones", "/asistencia"],
            AppRole::Medico => &["/medico"],
            AppRole::Direccion => &["/residentes", "/habitaciones", "/reportes"],
        }
    }

    /// Where a fresh login lands
    pub fn landing_path(&self) -> &'static str {
        match self {
            AppRole::Administrador | AppRole::Direccion => "/dashboard",
            AppRole::Docente => "/calificaciones",
            AppRole::Medico => "/medico",
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`authorize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Static asset prefixes, served to anonymous callers as well
const STATIC_PREFIXES: &[&str] = &["/lib", "/css", "/js", "/favicon"];

/// True for stylesheet, script, library and icon paths (already lower-cased).
///
/// Prefixes match whole segments: `/css/site.css` and `/favicon.ico` are
/// assets, `/cssfoo` is not.
pub fn is_static_asset(path: &str) -> bool {
    STATIC_PREFIXES
        .iter()
        .any(|prefix| matches_segment(path, prefix))
}

/// `path` is `prefix` itself or continues it with `/` or `.`
pub fn matches_segment(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('.'))
}

/// Shared pages. `/` only matches the root itself, otherwise it would
/// prefix every path.
fn is_common_path(path: &str) -> bool {
    path == "/" || COMMON_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Decide whether `role` may reach `path`.
///
/// Roles outside the table are denied everything but the common pages.
pub fn authorize(path: &str, role: &str) -> Decision {
    let path = path.to_lowercase();

    if is_common_path(&path) {
        return Decision::Allow;
    }

    match AppRole::from_claim(role) {
        Some(AppRole::PRIVILEGED) => Decision::Allow,
        Some(known) => {
            if known
                .allowed_prefixes()
                .iter()
                .any(|prefix| path.starts_with(prefix))
            {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        None => Decision::Deny,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_open_to_every_role() {
        for role in ["Administrador", "Docente", "Medico", "Direccion", "No Role", ""] {
            assert_eq!(authorize("/dashboard", role), Decision::Allow, "{}", role);
        }
    }

    #[test]
    fn test_reportes_by_role() {
        assert_eq!(authorize("/reportes", "Docente"), Decision::Deny);
        assert_eq!(authorize("/reportes", "Administrador"), Decision::Allow);
        assert_eq!(authorize("/reportes", "Direccion"), Decision::Allow);
        assert_eq!(authorize("/reportes/excel", "Direccion"), Decision::Allow);
    }

    #[test]
    fn test_role_table() {
        assert!(authorize("/calificaciones/index", "Docente").is_allowed());
        assert!(authorize("/asistencia", "Docente").is_allowed());
        assert!(!authorize("/medico", "Docente").is_allowed());
        assert!(authorize("/medico/consultas", "Medico").is_allowed());
        assert!(!authorize("/residentes", "Medico").is_allowed());
        assert!(authorize("/habitaciones/edit/3", "Direccion").is_allowed());
    }

    #[test]
    fn test_static_assets_match_whole_segments() {
        assert!(is_static_asset("/css/site.css"));
        assert!(is_static_asset("/js"));
        assert!(is_static_asset("/favicon.ico"));
        assert!(!is_static_asset("/jsonexport"));
        assert!(!is_static_asset("/library"));
        assert!(matches_segment("/health", "/health"));
        assert!(!matches_segment("/healthrecords", "/health"));
    }

    #[test]
    fn test_path_is_case_normalized() {
        assert!(authorize("/Reportes/Index", "Direccion").is_allowed());
        assert!(authorize("/DASHBOARD", "Docente").is_allowed());
    }

    #[test]
    fn test_role_claim_is_case_sensitive() {
        assert!(!authorize("/reportes", "direccion").is_allowed());
        assert!(!authorize("/usuarios", "administrador").is_allowed());
    }

    #[test]
    fn test_root_is_exact_match() {
        assert!(authorize("/", "Medico").is_allowed());
        assert!(!authorize("/usuarios", "Medico").is_allowed());
    }

    #[test]
    fn test_unknown_role_default_deny() {
        assert!(!authorize("/residentes", "No Role").is_allowed());
        assert!(!authorize("/calificaciones", "Invitado").is_allowed());
        assert!(authorize("/css/site.css", "Invitado").is_allowed());
        assert!(authorize("/account/logout", "Invitado").is_allowed());
    }

    #[test]
    fn test_administrador_allowed_everywhere() {
        for path in ["/usuarios", "/medicamentos/inventario", "/reportes", "/x/y/z"] {
            assert!(authorize(path, "Administrador").is_allowed(), "{}", path);
        }
    }

    #[test]
    fn test_from_claim_round_trips_names() {
        for role in AppRole::ALL {
            assert_eq!(AppRole::from_claim(role.as_str()), Some(role));
        }
        assert_eq!(AppRole::from_claim("No Role"), None);
    }
}
