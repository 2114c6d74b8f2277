//! Security properties bound under `security`

use elif_config::naming;
use elif_config::{
    BindContext, Bindable, ConfigError, ConfigValidator, ConfigValue, ConfigurationProperties,
    ConversionError, ConversionService, FieldSpec, FromConfig, LengthValidator, OrderedSet,
    PrefixValidator, PropertyNode,
};
use std::fmt;
use std::str::FromStr;

/// Order of the security filter chain among request filters
pub const DEFAULT_FILTER_ORDER: i32 = -100;

/// Paths left unsecured when `security.ignored` is empty
pub const DEFAULT_IGNORED: &[&str] = &[
    "/css/**",
    "/js/**",
    "/images/**",
    "/webjars/**",
    "**/favicon.ico",
];

/// Value of `security.ignored` that switches the default ignored paths off
pub const IGNORED_NONE: &str = "none";

macro_rules! relaxed_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = naming::normalize(s.trim());
                $(
                    if wanted == naming::normalize($text) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} '{}'", stringify!($name), s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }
    };
}

/// Which requests HTTP basic authentication admits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizeMode {
    /// Must be a member of one of the configured roles
    #[default]
    Role,
    /// Must be authenticated, any role
    Authenticated,
    /// No authorization for the secured paths
    None,
}

relaxed_enum!(AuthorizeMode {
    Role => "role",
    Authenticated => "authenticated",
    None => "none",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionCreationPolicy {
    Always,
    Never,
    IfRequired,
    #[default]
    Stateless,
}

relaxed_enum!(SessionCreationPolicy {
    Always => "always",
    Never => "never",
    IfRequired => "if-required",
    Stateless => "stateless",
});

/// Strict-Transport-Security header mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hsts {
    None,
    /// Include sub-domains
    Domain,
    #[default]
    All,
}

relaxed_enum!(Hsts {
    None => "none",
    Domain => "domain",
    All => "all",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentSecurityPolicyMode {
    #[default]
    Default,
    ReportOnly,
}

relaxed_enum!(ContentSecurityPolicyMode {
    Default => "default",
    ReportOnly => "report-only",
});

/// Request dispatch kinds the security filter is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherType {
    Forward,
    Include,
    Request,
    Async,
    Error,
}

relaxed_enum!(DispatcherType {
    Forward => "FORWARD",
    Include => "INCLUDE",
    Request => "REQUEST",
    Async => "ASYNC",
    Error => "ERROR",
});

elif_config::impl_from_config_via_str!(
    AuthorizeMode,
    SessionCreationPolicy,
    Hsts,
    ContentSecurityPolicyMode,
);

/// Password of the default user; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Random password generated at startup
    pub fn generated() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

impl FromConfig for Password {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        String::from_config(node, conversion).map(Password)
    }

    /// Empty values and unresolved placeholders keep the generated password
    fn falls_back(value: &ConfigValue) -> bool {
        value.is_empty_text() || value.is_unresolved()
    }
}

/// Settings of the default user
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    password: Password,
    default_password: bool,
    pub role: OrderedSet<String>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            name: "user".to_string(),
            password: Password::generated(),
            default_password: true,
            role: ["USER".to_string()].into_iter().collect(),
        }
    }
}

impl User {
    pub fn password(&self) -> &Password {
        &self.password
    }

    pub fn set_password(&mut self, password: Password) {
        self.password = password;
        self.default_password = false;
    }

    /// True while the password is still the generated one
    pub fn is_default_password(&self) -> bool {
        self.default_password
    }
}

impl Bindable for User {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("name", "string", "Default user name"),
            FieldSpec::scalar("password", "string", "Password for the default user name"),
            FieldSpec::sequence("role", "string", "Granted roles for the default user name"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "name" => {
                ctx.assign(node, &mut self.name);
            }
            "password" => {
                let mut password = self.password.clone();
                if ctx.assign(node, &mut password) == elif_config::Assignment::Assigned {
                    self.set_password(password);
                }
            }
            "role" => {
                ctx.assign(node, &mut self.role);
            }
            _ => {}
        }
    }
}

/// HTTP basic authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basic {
    pub enabled: bool,
    pub realm: String,
    /// Comma-separated paths to secure
    pub path: Vec<String>,
    pub authorize_mode: AuthorizeMode,
}

impl Default for Basic {
    fn default() -> Self {
        Self {
            enabled: true,
            realm: "elif".to_string(),
            path: vec!["/**".to_string()],
            authorize_mode: AuthorizeMode::Role,
        }
    }
}

impl Bindable for Basic {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("enabled", "bool", "Enable basic authentication"),
            FieldSpec::scalar("realm", "string", "HTTP basic realm name"),
            FieldSpec::sequence("path", "string", "Paths to secure"),
            FieldSpec::scalar("authorize-mode", "role|authenticated|none", "Security authorize mode"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "enabled" => {
                ctx.assign(node, &mut self.enabled);
            }
            "realm" => {
                ctx.assign(node, &mut self.realm);
            }
            "path" => {
                ctx.assign(node, &mut self.path);
            }
            "authorize-mode" => {
                ctx.assign(node, &mut self.authorize_mode);
            }
            _ => {}
        }
    }
}

/// Response security headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    pub xss: bool,
    pub cache: bool,
    pub frame: bool,
    pub content_type: bool,
    pub content_security_policy: Option<String>,
    pub content_security_policy_mode: ContentSecurityPolicyMode,
    pub hsts: Hsts,
}

impl Default for Headers {
    fn default() -> Self {
        Self {
            xss: true,
            cache: true,
            frame: true,
            content_type: true,
            content_security_policy: None,
            content_security_policy_mode: ContentSecurityPolicyMode::Default,
            hsts: Hsts::All,
        }
    }
}

impl Bindable for Headers {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("xss", "bool", "Enable cross site scripting protection"),
            FieldSpec::scalar("cache", "bool", "Enable cache control HTTP headers"),
            FieldSpec::scalar("frame", "bool", "Enable X-Frame-Options header"),
            FieldSpec::scalar("content-type", "bool", "Enable X-Content-Type-Options header"),
            FieldSpec::scalar("content-security-policy", "string", "Content-Security-Policy header value"),
            FieldSpec::scalar("content-security-policy-mode", "default|report-only", "Content security policy mode"),
            FieldSpec::scalar("hsts", "none|domain|all", "HTTP Strict Transport Security mode"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "xss" => {
                ctx.assign(node, &mut self.xss);
            }
            "cache" => {
                ctx.assign(node, &mut self.cache);
            }
            "frame" => {
                ctx.assign(node, &mut self.frame);
            }
            "content-type" => {
                ctx.assign(node, &mut self.content_type);
            }
            "content-security-policy" => {
                ctx.assign(node, &mut self.content_security_policy);
            }
            "content-security-policy-mode" => {
                ctx.assign(node, &mut self.content_security_policy_mode);
            }
            "hsts" => {
                ctx.assign(node, &mut self.hsts);
            }
            _ => {}
        }
    }
}

/// Everything configurable under `security`
#[derive(Debug, Clone)]
pub struct SecurityProperties {
    pub require_ssl: bool,
    pub enable_csrf: bool,
    pub basic: Basic,
    pub filter_order: i32,
    pub filter_dispatcher_types: OrderedSet<DispatcherType>,
    pub headers: Headers,
    pub sessions: SessionCreationPolicy,
    /// Comma-separated paths to leave unsecured
    pub ignored: Vec<String>,
    pub user: User,
}

impl Default for SecurityProperties {
    fn default() -> Self {
        Self {
            require_ssl: false,
            enable_csrf: false,
            basic: Basic::default(),
            filter_order: DEFAULT_FILTER_ORDER,
            filter_dispatcher_types: [
                DispatcherType::Async,
                DispatcherType::Error,
                DispatcherType::Request,
            ]
            .into_iter()
            .collect(),
            headers: Headers::default(),
            sessions: SessionCreationPolicy::Stateless,
            ignored: Vec::new(),
            user: User::default(),
        }
    }
}

impl SecurityProperties {
    /// Paths that bypass security: `none` disables them, an empty list means the defaults
    pub fn effective_ignored(&self) -> Vec<String> {
        match self.ignored.as_slice() {
            [] => DEFAULT_IGNORED.iter().map(|p| p.to_string()).collect(),
            [only] if only.trim().eq_ignore_ascii_case(IGNORED_NONE) => Vec::new(),
            paths => paths.to_vec(),
        }
    }

    /// Post-bind checks on values the binder accepts but security cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        let paths = PrefixValidator::new(&["/", "**"]).allow_literal(IGNORED_NONE);
        paths.validate("security.ignored", &self.ignored)?;
        paths.validate("security.basic.path", &self.basic.path)?;

        let names = LengthValidator::min(1);
        names.validate("security.user.name", &self.user.name)?;
        names.validate("security.basic.realm", &self.basic.realm)?;

        if self.user.role.is_empty() {
            return Err(ConfigError::validation_failed(
                "security.user.role must name at least one role",
            ));
        }
        Ok(())
    }
}

impl Bindable for SecurityProperties {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("require-ssl", "bool", "Enable secure channel for all requests"),
            FieldSpec::scalar("enable-csrf", "bool", "Enable Cross Site Request Forgery support"),
            FieldSpec::nested("basic", Basic::fields, "HTTP basic authentication"),
            FieldSpec::scalar("filter-order", "i32", "Security filter chain order"),
            FieldSpec::sequence("filter-dispatcher-types", "DispatcherType", "Security filter chain dispatcher types"),
            FieldSpec::nested("headers", Headers::fields, "Response security headers"),
            FieldSpec::scalar("sessions", "always|never|if-required|stateless", "Session creation policy"),
            FieldSpec::sequence("ignored", "string", "Paths to exclude from the default secured paths"),
            FieldSpec::nested("user", User::fields, "Default user"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "require-ssl" => {
                ctx.assign(node, &mut self.require_ssl);
            }
            "enable-csrf" => {
                ctx.assign(node, &mut self.enable_csrf);
            }
            "basic" => ctx.nested(node, &mut self.basic),
            "filter-order" => {
                ctx.assign(node, &mut self.filter_order);
            }
            "filter-dispatcher-types" => {
                ctx.assign(node, &mut self.filter_dispatcher_types);
            }
            "headers" => ctx.nested(node, &mut self.headers),
            "sessions" => {
                ctx.assign(node, &mut self.sessions);
            }
            "ignored" => {
                ctx.assign(node, &mut self.ignored);
            }
            "user" => ctx.nested(node, &mut self.user),
            _ => {}
        }
    }
}

impl ConfigurationProperties for SecurityProperties {
    const PREFIX: &'static str = "security";
}
