use httpmock::prelude::*;
use studio_api::{BlockingStudioClient, BuildOptions, ClientError, KeyMaterial, Software};

const XML: &str = "application/xml";

fn client(server: &MockServer) -> BlockingStudioClient {
    BlockingStudioClient::new(server.base_url())
        .unwrap()
        .with_credentials("joe", "key")
}

#[test]
fn test_clone_sends_source_and_options_in_query() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances")
            .query_param("clone_from", "1234")
            .query_param("appliance_id", "1234")
            .query_param("name", "x");
        then.status(200)
            .header("Content-Type", XML)
            .body("<appliance><id>4321</id><name>x</name></appliance>");
    });

    let appliance = client(&server).clone_appliance(1234, &[("name", "x")]).unwrap();

    assert_eq!(appliance.id, 4321);
    assert_eq!(appliance.name.as_deref(), Some("x"));
    mock.assert();
}

#[test]
fn test_credentials_are_sent_as_basic_auth() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/appliances")
            .header("Authorization", "Basic am9lOmtleQ==")
            .header("Accept", XML);
        then.status(200)
            .header("Content-Type", XML)
            .body("<appliances><appliance><id>1</id></appliance><appliance><id>2</id></appliance></appliances>");
    });

    let appliances = client(&server).appliances().unwrap();

    let ids: Vec<_> = appliances.iter().map(|appliance| appliance.id).collect();
    assert_eq!(ids, [1, 2]);
    mock.assert();
}

#[test]
fn test_add_repository_flattens_nested_ids() {
    let server = MockServer::start();

    let mocks: Vec<_> = ["1", "2", "3"]
        .into_iter()
        .map(|repo_id| {
            server.mock(|when, then| {
                when.method(POST)
                    .path("/appliances/24/cmd/add_repository")
                    .query_param("repo_id", repo_id);
                then.status(200).body("<success/>");
            })
        })
        .collect();

    client(&server)
        .add_repository(24, vec![vec![1_u64], vec![2, 3]])
        .unwrap();

    for mock in &mocks {
        mock.assert();
    }
}

#[test]
fn test_remove_repository_stops_at_first_failure() {
    let server = MockServer::start();

    let first = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances/24/cmd/remove_repository")
            .query_param("repo_id", "1");
        then.status(200).body("<success/>");
    });
    let second = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances/24/cmd/remove_repository")
            .query_param("repo_id", "2");
        then.status(500).body("boom");
    });

    let error = client(&server).remove_repository(24, [1_u64, 2, 3]).unwrap_err();

    match error {
        ClientError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    first.assert();
    second.assert();
}

#[test]
fn test_installed_software_for_build() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/appliances/24/software/installed")
            .query_param("build_id", "28");
        then.status(200).header("Content-Type", XML).body(
            r#"<software>
  <repository id="10"><software><pattern>base</pattern></software></repository>
  <repository id="20"><software><package version="7.2">vim</package></software></repository>
</software>"#,
        );
    });

    let software = client(&server).installed_software(24, Some(28)).unwrap();

    assert_eq!(software.len(), 2);
    assert!(matches!(&software[0], Software::Pattern(pattern) if pattern.repository_id == Some(10)));
    assert!(matches!(&software[1], Software::Package(package) if package.repository_id == Some(20)));
    mock.assert();
}

#[test]
fn test_missing_gpg_key_is_none() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/appliances/24/gpg_keys/9");
        then.status(404).body("<error><code>not_found</code></error>");
    });

    let key = client(&server).gpg_key(24, 9).unwrap();

    assert!(key.is_none());
    mock.assert();
}

#[test]
fn test_add_gpg_key_defaults_target() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances/24/gpg_keys")
            .query_param("name", "my key")
            .query_param("target", "rpm")
            .query_param("key", "-----BEGIN PGP");
        then.status(200).header("Content-Type", XML).body(
            "<gpg_key><id>1976</id><name>my key</name><target>rpm</target></gpg_key>",
        );
    });

    let key = client(&server)
        .add_gpg_key(24, "my key", "-----BEGIN PGP", &[])
        .unwrap();

    assert_eq!(key.id, 1976);
    assert_eq!(key.appliance_id, 24);
    assert_eq!(key.target.as_deref(), Some("rpm"));
    mock.assert();
}

#[test]
fn test_add_gpg_key_uploads_key_file_as_multipart() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances/24/gpg_keys")
            .query_param("name", "file key")
            .query_param("target", "rpm")
            .query_param_missing("key")
            .header_includes("content-type", "multipart/form-data")
            .body_includes("name=\"key\"")
            .body_includes("-----BEGIN PGP PUBLIC KEY BLOCK-----");
        then.status(200)
            .header("Content-Type", XML)
            .body("<gpg_key><id>7</id><name>file key</name></gpg_key>");
    });

    let key = KeyMaterial::File {
        file_name: "my.cert".to_owned(),
        data: b"-----BEGIN PGP PUBLIC KEY BLOCK-----".to_vec(),
    };
    let uploaded = client(&server)
        .add_gpg_key(24, "file key", key, &[])
        .unwrap();

    assert_eq!(uploaded.id, 7);
    mock.assert();
}

#[test]
fn test_ban_package_posts_command() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/appliances/24/cmd/ban_package")
            .query_param("name", "nano");
        then.status(200).body("<success/>");
    });

    client(&server).ban_package(24, "nano", &[]).unwrap();

    mock.assert();
}

#[test]
fn test_start_build_reports_existing_image() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/running_builds")
            .query_param("appliance_id", "24");
        then.status(400).header("Content-Type", XML).body(
            "<error><code>image_already_exists</code><message>Image 0.0.1 already exists</message></error>",
        );
    });

    let error = client(&server)
        .start_build(24, &BuildOptions::default())
        .unwrap_err();

    assert!(matches!(error, ClientError::ImageAlreadyExists(message) if message == "Image 0.0.1 already exists"));
    mock.assert();
}

#[test]
fn test_raw_request_returns_xml_tree() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/template_sets")
            .query_param("kind", "all");
        then.status(200)
            .header("Content-Type", XML)
            .body("<template_sets><template_set><name>default</name></template_set></template_sets>");
    });

    let tree = client(&server)
        .request_xml_with_query(reqwest::Method::GET, "/template_sets", &[("kind", "all")])
        .unwrap();

    assert_eq!(tree["template_set"][0]["name"][0], "default");
    mock.assert();
}
