//! Candidate transport list.
//!
//! [`build_candidates`] expands one configured host/port into the ordered
//! list of variants the dispatcher walks:
//!
//! | Label         | Port | Encryption        | Added when                          |
//! |---------------|------|-------------------|-------------------------------------|
//! | `configured`  | cfg  | from the port     | always, first                       |
//! | `ms-starttls` | 587  | STARTTLS          | Microsoft host, port not 587        |
//! | `ssl465`      | 465  | implicit TLS      | port not 465                        |
//! | `starttls587` | 587  | STARTTLS          | no STARTTLS/587 entry yet           |
//! | `plain25`     | 25   | none              | always                              |
//!
//! Entries with the same [`TransportIdentity`](crate::TransportIdentity) are
//! collapsed, keeping the first entry and its label. With a configured port
//! of 25 the plaintext entry therefore stays labelled `configured` at the
//! front of the list instead of `plain25`.

use std::collections::HashSet;

use crate::config::MailConfig;
use crate::transport::{Encryption, TransportDescriptor};

/// Host fragments that mark a Microsoft-hosted mailbox.
const MICROSOFT_HOST_MARKERS: [&str; 3] = ["office", "outlook", "microsoft"];

/// Builds the ordered, de-duplicated transport list for `config`.
///
/// The result always has at least two entries and starts with the configured
/// transport.
#[must_use]
pub fn build_candidates(config: &MailConfig) -> Vec<TransportDescriptor> {
    let host = config.host.as_str();
    let port = config.port;

    let mut candidates = vec![TransportDescriptor::new(
        host,
        port,
        Encryption::for_port(port),
        "configured",
    )];

    if is_microsoft_host(host) && port != 587 {
        candidates.push(TransportDescriptor::new(
            host,
            587,
            Encryption::StartTls,
            "ms-starttls",
        ));
    }

    if port != 465 {
        candidates.push(TransportDescriptor::new(
            host,
            465,
            Encryption::ImplicitTls,
            "ssl465",
        ));
    }

    if !candidates
        .iter()
        .any(|c| c.port() == 587 && c.uses_starttls())
    {
        candidates.push(TransportDescriptor::new(
            host,
            587,
            Encryption::StartTls,
            "starttls587",
        ));
    }

    candidates.push(TransportDescriptor::new(host, 25, Encryption::None, "plain25"));

    let mut seen = HashSet::with_capacity(candidates.len());
    candidates.retain(|c| seen.insert(c.identity()));
    candidates
}

fn is_microsoft_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    MICROSOFT_HOST_MARKERS
        .iter()
        .any(|marker| host.contains(marker))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(host: &str, port: u16) -> MailConfig {
        MailConfig::default().with_host(host).with_port(port)
    }

    fn labels(candidates: &[TransportDescriptor]) -> Vec<&'static str> {
        candidates.iter().map(TransportDescriptor::label).collect()
    }

    #[test]
    fn test_default_configuration() {
        let candidates = build_candidates(&MailConfig::default());
        assert_eq!(labels(&candidates), ["configured", "starttls587", "plain25"]);
        assert!(candidates[0].uses_implicit_tls());
        assert_eq!(candidates[0].port(), 465);
        assert_eq!(candidates[0].host(), "smtp.mail.us-east-1.awsapps.com");
    }

    #[test]
    fn test_microsoft_host_gets_starttls_second() {
        let candidates = build_candidates(&config("smtp.office365.com", 465));
        assert_eq!(labels(&candidates), ["configured", "ms-starttls", "plain25"]);

        let second = &candidates[1];
        assert_eq!(second.port(), 587);
        assert!(second.uses_starttls());
        assert!(!second.uses_implicit_tls());
    }

    #[test]
    fn test_microsoft_detection_is_case_insensitive() {
        let candidates = build_candidates(&config("SMTP-Mail.Outlook.com", 2525));
        assert_eq!(
            labels(&candidates),
            ["configured", "ms-starttls", "ssl465", "plain25"]
        );
    }

    #[test]
    fn test_configured_starttls_port_leads() {
        let candidates = build_candidates(&config("smtp.example.com", 587));
        assert_eq!(labels(&candidates), ["configured", "ssl465", "plain25"]);

        let first = &candidates[0];
        assert_eq!(first.host(), "smtp.example.com");
        assert_eq!(first.port(), 587);
        assert!(first.uses_starttls());
    }

    #[test]
    fn test_microsoft_host_on_587_adds_no_duplicate() {
        let candidates = build_candidates(&config("smtp.office365.com", 587));
        assert_eq!(labels(&candidates), ["configured", "ssl465", "plain25"]);
    }

    #[test]
    fn test_configured_port_25_keeps_seed() {
        let candidates = build_candidates(&config("mail.example.com", 25));
        assert_eq!(labels(&candidates), ["configured", "ssl465", "starttls587"]);
        assert_eq!(candidates[0].encryption(), Encryption::None);
    }

    #[test]
    fn test_nonstandard_port_gets_full_list() {
        let candidates = build_candidates(&config("smtp.example.com", 2525));
        assert_eq!(
            labels(&candidates),
            ["configured", "ssl465", "starttls587", "plain25"]
        );
        assert_eq!(candidates[0].encryption(), Encryption::None);
    }

    fn host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("smtp.office365.com".to_string()),
            Just("smtp-mail.outlook.com".to_string()),
            Just("mail.microsoft.example".to_string()),
            Just("smtp.mail.us-east-1.awsapps.com".to_string()),
            "[a-z]{1,12}(\\.[a-z]{2,6}){1,2}",
        ]
    }

    fn port_strategy() -> impl Strategy<Value = u16> {
        prop_oneof![Just(25u16), Just(465u16), Just(587u16), 1u16..=u16::MAX]
    }

    proptest! {
        #[test]
        fn prop_candidates_are_unique_and_ordered(host in host_strategy(), port in port_strategy()) {
            let candidates = build_candidates(&config(&host, port));

            prop_assert!(candidates.len() >= 2);

            let identities: HashSet<_> = candidates.iter().map(TransportDescriptor::identity).collect();
            prop_assert_eq!(identities.len(), candidates.len());

            let first = &candidates[0];
            prop_assert_eq!(first.label(), "configured");
            prop_assert_eq!(first.port(), port);
            prop_assert_eq!(first.host(), host.as_str());

            let last = &candidates[candidates.len() - 1];
            if port == 25 {
                prop_assert_eq!(candidates.iter().filter(|c| c.port() == 25).count(), 1);
                prop_assert!(candidates.iter().all(|c| c.label() != "plain25"));
            } else {
                prop_assert_eq!(last.label(), "plain25");
                prop_assert_eq!(last.port(), 25);
                prop_assert_eq!(last.encryption(), Encryption::None);
            }

            prop_assert!(candidates.iter().any(|c| c.port() == 587 && c.uses_starttls()));
            prop_assert!(candidates.iter().all(|c| !(c.uses_implicit_tls() && c.uses_starttls())));
        }

        #[test]
        fn prop_candidates_are_deterministic(host in host_strategy(), port in port_strategy()) {
            let cfg = config(&host, port);
            prop_assert_eq!(build_candidates(&cfg), build_candidates(&cfg));
        }
    }
}
