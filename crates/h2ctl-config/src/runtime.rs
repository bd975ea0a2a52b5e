//! Resolves the JVM invocation used to run the server tool.
//!
//! The start and stop paths both execute `<java> -cp <classpath> <main class>`
//! followed by their argument vector, so they need to agree on how the Java
//! executable and the classpath are located.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::ServerConfig;

/// Environment variable overriding the Java executable.
pub const JAVA_OVERRIDE_ENV: &str = "H2CTL_JAVA";

/// Environment variable overriding the local Maven repository root.
pub const MAVEN_REPOSITORY_ENV: &str = "H2CTL_MAVEN_REPOSITORY";

/// Maven `group:artifact:version` coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCoordinate {
    group: String,
    artifact: String,
    version: String,
}

impl ArtifactCoordinate {
    /// Location of the artifact's jar inside a Maven repository layout.
    #[must_use]
    pub fn jar_path(&self, repository: &Path) -> PathBuf {
        let mut path = repository.to_path_buf();
        path.extend(self.group.split('.'));
        path.push(&self.artifact);
        path.push(&self.version);
        path.push(format!("{}-{}.jar", self.artifact, self.version));
        path
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl FromStr for ArtifactCoordinate {
    type Err = RuntimeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split(':');
        let (Some(group), Some(artifact), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(RuntimeError::InvalidCoordinate {
                coordinate: input.to_owned(),
            });
        };
        if [group, artifact, version].iter().any(|part| part.trim().is_empty()) {
            return Err(RuntimeError::InvalidCoordinate {
                coordinate: input.to_owned(),
            });
        }
        Ok(Self {
            group: group.to_owned(),
            artifact: artifact.to_owned(),
            version: version.to_owned(),
        })
    }
}

/// Errors raised while resolving the server runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The coordinate was not `group:artifact:version`.
    #[error("runtime artifact '{coordinate}' must have the form group:artifact:version")]
    InvalidCoordinate { coordinate: String },
    /// No local Maven repository could be located.
    #[error(
        "cannot locate a local Maven repository for {coordinate}; set classpath or H2CTL_MAVEN_REPOSITORY"
    )]
    MissingRepository { coordinate: String },
    /// The derived jar does not exist.
    #[error("runtime artifact {coordinate} not found at {path:?}; set classpath explicitly")]
    ArtifactNotFound { coordinate: String, path: PathBuf },
}

/// The Java executable, classpath and main class that run the server tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRuntime {
    java: OsString,
    classpath: OsString,
    main_class: String,
}

impl ServerRuntime {
    /// Builds a runtime from explicit parts.
    #[must_use]
    pub fn new(
        java: impl Into<OsString>,
        classpath: impl Into<OsString>,
        main_class: impl Into<String>,
    ) -> Self {
        Self {
            java: java.into(),
            classpath: classpath.into(),
            main_class: main_class.into(),
        }
    }

    /// Resolves the runtime described by the configuration.
    ///
    /// The Java executable falls back from `java_binary` to `H2CTL_JAVA`, then
    /// `$JAVA_HOME/bin/java`, then `java` on the `PATH`. Without an explicit
    /// classpath the jar is looked up in the local Maven repository.
    pub fn from_config(config: &ServerConfig) -> Result<Self, RuntimeError> {
        let java = resolve_java(config.java_binary.as_deref());
        let classpath = match &config.classpath {
            Some(classpath) => OsString::from(classpath),
            None => resolve_artifact_jar(&config.runtime_artifact)?.into_os_string(),
        };
        Ok(Self::new(java, classpath, config.main_class.clone()))
    }

    /// Java executable.
    #[must_use]
    pub fn java(&self) -> &OsString {
        &self.java
    }

    /// Classpath handed to `-cp`.
    #[must_use]
    pub fn classpath(&self) -> &OsString {
        &self.classpath
    }

    /// Fully-qualified main class.
    #[must_use]
    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// Arguments placed before the tool's own arguments.
    #[must_use]
    pub fn jvm_arguments(&self) -> Vec<OsString> {
        vec![
            OsString::from("-cp"),
            self.classpath.clone(),
            OsString::from(&self.main_class),
        ]
    }
}

fn resolve_java(configured: Option<&str>) -> OsString {
    if let Some(java) = configured {
        return OsString::from(java);
    }
    if let Some(java) = env::var_os(JAVA_OVERRIDE_ENV) {
        return java;
    }
    if let Some(home) = env::var_os("JAVA_HOME") {
        let candidate = Path::new(&home).join("bin").join(java_executable_name());
        if candidate.is_file() {
            return candidate.into_os_string();
        }
    }
    OsString::from("java")
}

const fn java_executable_name() -> &'static str {
    if cfg!(windows) { "java.exe" } else { "java" }
}

fn resolve_artifact_jar(coordinate: &str) -> Result<PathBuf, RuntimeError> {
    let parsed: ArtifactCoordinate = coordinate.parse()?;
    let repository = maven_repository().ok_or_else(|| RuntimeError::MissingRepository {
        coordinate: coordinate.to_owned(),
    })?;
    jar_in_repository(&parsed, &repository)
}

fn jar_in_repository(
    coordinate: &ArtifactCoordinate,
    repository: &Path,
) -> Result<PathBuf, RuntimeError> {
    let jar = coordinate.jar_path(repository);
    if !jar.is_file() {
        return Err(RuntimeError::ArtifactNotFound {
            coordinate: coordinate.to_string(),
            path: jar,
        });
    }
    Ok(jar)
}

fn maven_repository() -> Option<PathBuf> {
    env::var_os(MAVEN_REPOSITORY_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".m2").join("repository")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_coordinate() {
        let coordinate: ArtifactCoordinate = "com.h2database:h2:2.0.202".parse().expect("valid");
        assert_eq!(coordinate.to_string(), "com.h2database:h2:2.0.202");
    }

    #[rstest]
    #[case("h2")]
    #[case("com.h2database:h2")]
    #[case("com.h2database::2.0.202")]
    #[case("a:b:c:d")]
    fn rejects_malformed_coordinates(#[case] input: &str) {
        assert!(matches!(
            input.parse::<ArtifactCoordinate>(),
            Err(RuntimeError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn jar_path_follows_maven_layout() {
        let coordinate: ArtifactCoordinate = "com.h2database:h2:2.0.202".parse().expect("valid");
        let path = coordinate.jar_path(Path::new("/repo"));
        assert_eq!(
            path,
            Path::new("/repo/com/h2database/h2/2.0.202/h2-2.0.202.jar")
        );
    }

    #[test]
    fn explicit_settings_take_precedence() {
        let config = ServerConfig {
            java_binary: Some("/opt/jdk/bin/java".to_owned()),
            classpath: Some("/libs/h2.jar".to_owned()),
            ..ServerConfig::default()
        };
        let runtime = ServerRuntime::from_config(&config).expect("runtime resolves");
        assert_eq!(runtime.java(), &OsString::from("/opt/jdk/bin/java"));
        assert_eq!(
            runtime.jvm_arguments(),
            vec![
                OsString::from("-cp"),
                OsString::from("/libs/h2.jar"),
                OsString::from("org.h2.tools.Server"),
            ]
        );
    }

    #[test]
    fn missing_jar_is_reported_with_its_path() {
        let repository = tempfile::tempdir().expect("temp dir");
        let coordinate: ArtifactCoordinate = "com.h2database:h2:2.0.202".parse().expect("valid");
        let expected = coordinate.jar_path(repository.path());
        let Err(RuntimeError::ArtifactNotFound { path, .. }) =
            jar_in_repository(&coordinate, repository.path())
        else {
            panic!("expected ArtifactNotFound");
        };
        assert_eq!(path, expected);
    }

    #[test]
    fn existing_jar_is_used_as_classpath() {
        let repository = tempfile::tempdir().expect("temp dir");
        let coordinate: ArtifactCoordinate = "com.h2database:h2:2.0.202".parse().expect("valid");
        let jar = coordinate.jar_path(repository.path());
        std::fs::create_dir_all(jar.parent().expect("jar has parent")).expect("create dirs");
        std::fs::write(&jar, b"").expect("write jar");
        assert_eq!(
            jar_in_repository(&coordinate, repository.path()).expect("jar resolves"),
            jar
        );
    }
}
