// crates/remote-trigger-core/tests/server_resolution.rs
// ============================================================================
// Module: Server Resolution Tests
// Description: Host precedence, auth inheritance, and job URL generation.
// Purpose: Pin down how a trigger chooses its remote server.
// ============================================================================

//! ## Overview
//! Example-based tests for each resolution rule plus a property test for the
//! job URL > override URL > named server precedence.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proptest::prelude::*;
use remote_trigger_core::AuthorizationProvider;
use remote_trigger_core::ConfigError;
use remote_trigger_core::RemoteBuildConfig;
use remote_trigger_core::RemoteServerDescriptor;
use remote_trigger_core::StaticServerLookup;
use remote_trigger_core::core::server::is_remote_url;
use remote_trigger_core::core::server::remove_hash_parameters;
use remote_trigger_core::core::server::remove_query_parameters;
use remote_trigger_core::core::server::remove_trailing_slashes;
use remote_trigger_core::effective_job_url;
use remote_trigger_core::evaluate_effective_remote_host;
use remote_trigger_core::generate_job_url;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn token(user: &str) -> AuthorizationProvider {
    AuthorizationProvider::UserTokenAuth {
        username: user.to_string(),
        token: "secret".to_string(),
    }
}

fn lookup() -> StaticServerLookup {
    StaticServerLookup::new(vec![
        RemoteServerDescriptor::new("https://named.example:8443/ci/")
            .with_name("named")
            .with_auth(token("named-user")),
    ])
}

fn config(job: &str) -> RemoteBuildConfig {
    RemoteBuildConfig::new(job)
}

// ============================================================================
// SECTION: Precedence
// ============================================================================

#[test]
fn named_server_supplies_address_and_auth() {
    let mut config = config("app");
    config.remote_server_name = Some("named".to_string());

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.name.as_deref(), Some("named"));
    assert_eq!(server.address, "https://named.example:8443/ci/");
    assert_eq!(server.auth, token("named-user"));
}

#[test]
fn job_url_overrides_address_but_keeps_named_auth() {
    let mut config = config("https://other.example/jenkins/job/Folder/job/app/");
    config.remote_server_name = Some("named".to_string());
    config.remote_server_url = Some("https://override.example".to_string());

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.address, "https://other.example/jenkins");
    assert_eq!(server.auth, token("named-user"));
}

#[test]
fn override_url_beats_named_server_address() {
    let mut config = config("app");
    config.remote_server_name = Some("named".to_string());
    config.remote_server_url = Some("https://override.example/root/".to_string());

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.address, "https://override.example/root");
    assert_eq!(server.auth, token("named-user"));
}

#[test]
fn override_url_alone_is_anonymous() {
    let mut config = config("app");
    config.remote_server_url = Some("http://override.example:8080".to_string());

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.name, None);
    assert_eq!(server.address, "http://override.example:8080");
    assert_eq!(server.auth, AuthorizationProvider::NoAuth);
}

#[test]
fn job_url_without_job_segment_uses_origin() {
    let config = config("http://plain.example:8080/some/path");

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.address, "http://plain.example:8080");
}

#[test]
fn auth_override_replaces_server_default() {
    let mut config = config("app");
    config.remote_server_name = Some("named".to_string());
    config.auth = Some(AuthorizationProvider::NoAuth);

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.auth, AuthorizationProvider::NoAuth);
}

#[test]
fn unknown_name_with_override_url_still_resolves() {
    let mut config = config("app");
    config.remote_server_name = Some("ghost".to_string());
    config.remote_server_url = Some("https://override.example".to_string());

    let server = evaluate_effective_remote_host(&config, &lookup()).unwrap();

    assert_eq!(server.address, "https://override.example");
}

// ============================================================================
// SECTION: Errors
// ============================================================================

#[test]
fn blank_job_is_missing_parameter() {
    let mut config = config("   ");
    config.remote_server_name = Some("named".to_string());

    let err = evaluate_effective_remote_host(&config, &lookup()).unwrap_err();

    assert_eq!(err, ConfigError::MissingParameter("job".to_string()));
}

#[test]
fn override_without_scheme_is_invalid() {
    let mut config = config("app");
    config.remote_server_url = Some("hostname:8080".to_string());

    let err = evaluate_effective_remote_host(&config, &lookup()).unwrap_err();

    assert_eq!(
        err,
        ConfigError::InvalidUrl {
            parameter: "remote_server_url".to_string(),
            value: "hostname:8080".to_string(),
        }
    );
    assert!(err.to_string().contains("hostname:8080"));
}

#[test]
fn unknown_server_name_is_reported() {
    let mut config = config("app");
    config.remote_server_name = Some("ghost".to_string());

    let err = evaluate_effective_remote_host(&config, &lookup()).unwrap_err();

    assert_eq!(err, ConfigError::UnknownRemoteServer("ghost".to_string()));
}

#[test]
fn no_host_at_all_is_missing_remote_host() {
    let err = evaluate_effective_remote_host(&config("app"), &lookup()).unwrap_err();

    assert_eq!(err, ConfigError::MissingRemoteHost);
}

#[test]
fn named_server_with_invalid_address_is_rejected() {
    let lookup = StaticServerLookup::new(vec![
        RemoteServerDescriptor::new("ftp://files.example").with_name("bad"),
    ]);
    let mut config = config("app");
    config.remote_server_name = Some("bad".to_string());

    let err = evaluate_effective_remote_host(&config, &lookup).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidUrl { .. }));
}

// ============================================================================
// SECTION: Job URLs
// ============================================================================

#[test]
fn job_url_nests_folders() {
    let server = RemoteServerDescriptor::new("https://server:8080/jenkins");

    let url = generate_job_url(&server, "Folder/JobName").unwrap();

    assert_eq!(url.as_str(), "https://server:8080/jenkins/job/Folder/job/JobName");
}

#[test]
fn job_url_ignores_trailing_slashes_and_suffixes() {
    let server = RemoteServerDescriptor::new("https://server:8080/jenkins//");

    let url = generate_job_url(&server, "Folder/JobName/?delay=0#top").unwrap();

    assert_eq!(url.as_str(), "https://server:8080/jenkins/job/Folder/job/JobName");
}

#[test]
fn job_url_on_root_address() {
    let server = RemoteServerDescriptor::new("http://ci.example");

    let url = generate_job_url(&server, "app").unwrap();

    assert_eq!(url.as_str(), "http://ci.example/job/app");
}

#[test]
fn job_url_segments_are_encoded() {
    let server = RemoteServerDescriptor::new("http://ci.example");

    let url = generate_job_url(&server, "My Folder/build & test").unwrap();

    assert_eq!(url.as_str(), "http://ci.example/job/My%20Folder/job/build%20&%20test");
}

#[test]
fn job_url_requires_job_and_address() {
    let valid = RemoteServerDescriptor::new("http://ci.example");
    let blank = RemoteServerDescriptor::new("   ");

    assert_eq!(
        generate_job_url(&valid, " / ").unwrap_err(),
        ConfigError::MissingParameter("job".to_string())
    );
    assert!(matches!(generate_job_url(&blank, "app"), Err(ConfigError::InvalidUrl { .. })));
}

#[test]
fn effective_job_url_prefers_literal_url() {
    let server = RemoteServerDescriptor::new("http://ci.example");
    let literal = config("http://ci.example/job/app/?token=x");
    let named = config("tools/app");

    assert_eq!(
        effective_job_url(&literal, &server).unwrap().as_str(),
        "http://ci.example/job/app"
    );
    assert_eq!(
        effective_job_url(&named, &server).unwrap().as_str(),
        "http://ci.example/job/tools/job/app"
    );
}

#[test]
fn url_helpers_normalize() {
    assert_eq!(remove_trailing_slashes("xxx/     "), "xxx");
    assert_eq!(remove_trailing_slashes("xxx/ / //"), "xxx");
    assert_eq!(remove_query_parameters("a/b?x=1#y"), "a/b");
    assert_eq!(remove_hash_parameters("a/b#frag?x"), "a/b");
    assert!(is_remote_url(" https://host "));
    assert!(!is_remote_url("hostname:8080"));
    assert!(!is_remote_url("Folder/Job"));
}

// ============================================================================
// SECTION: Property Tests
// ============================================================================

proptest! {
    #[test]
    fn address_follows_precedence(
        job_is_url in any::<bool>(),
        with_override in any::<bool>(),
        with_name in any::<bool>(),
        job in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
    ) {
        let mut config = if job_is_url {
            config(&format!("https://job.example/base/job/{job}"))
        } else {
            config(&job)
        };
        if with_override {
            config.remote_server_url = Some("https://override.example".to_string());
        }
        if with_name {
            config.remote_server_name = Some("named".to_string());
        }

        let resolved = evaluate_effective_remote_host(&config, &lookup());

        let expected = if job_is_url {
            Some("https://job.example/base")
        } else if with_override {
            Some("https://override.example")
        } else if with_name {
            Some("https://named.example:8443/ci/")
        } else {
            None
        };
        match expected {
            Some(address) => {
                let server = resolved.unwrap();
                prop_assert_eq!(server.address.as_str(), address);
                let expected_auth =
                    if with_name { token("named-user") } else { AuthorizationProvider::NoAuth };
                prop_assert_eq!(server.auth, expected_auth);
            }
            None => prop_assert_eq!(resolved.unwrap_err(), ConfigError::MissingRemoteHost),
        }
    }

    #[test]
    fn generated_job_url_round_trips_segments(job in "[A-Za-z0-9 _-]{1,12}(/[A-Za-z0-9 _-]{1,12}){0,3}") {
        let server = RemoteServerDescriptor::new("https://ci.example/root");
        let trimmed: Vec<&str> =
            job.split('/').map(str::trim).filter(|segment| !segment.is_empty()).collect();
        prop_assume!(!trimmed.is_empty());

        let url = generate_job_url(&server, &job).unwrap();
        let segments: Vec<String> = url
            .path_segments()
            .unwrap()
            .map(|segment| percent_decode(segment))
            .collect();

        prop_assert_eq!(segments[0].as_str(), "root");
        let names: Vec<&str> = segments[1 ..].chunks(2).map(|pair| {
            assert_eq!(pair[0], "job");
            pair[1].as_str()
        }).collect();
        prop_assert_eq!(names, trimmed);
    }
}

fn percent_decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("x={}", segment.replace('+', "%2B")).as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap()
}
