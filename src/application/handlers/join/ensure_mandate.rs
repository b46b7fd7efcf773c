//! Direct debit mandate step with a trailing idempotency window.

use chrono::{Duration, Utc};

use crate::domain::join::JoinRequest;
use crate::ports::{MandateError, MandateProvider, MandateRecord, MandateRequest};

/// Whether the mandate was made by this attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MandateOutcome {
    Created(MandateRecord),
    Reused(MandateRecord),
}

impl MandateOutcome {
    pub fn record(&self) -> &MandateRecord {
        match self {
            MandateOutcome::Created(record) | MandateOutcome::Reused(record) => record,
        }
    }
}

/// Reuses a mandate made for this email within `window`, otherwise creates one.
pub async fn ensure_mandate(
    provider: &dyn MandateProvider,
    request: &JoinRequest,
    window: Duration,
) -> Result<MandateOutcome, MandateError> {
    let email = request.normalized_email();
    let since = Utc::now() - window;

    if let Some(existing) = provider.find_recent_mandate(&email, since).await? {
        return Ok(MandateOutcome::Reused(existing));
    }

    let created = provider.create_mandate(mandate_request(request)).await?;
    Ok(MandateOutcome::Created(created))
}

fn mandate_request(request: &JoinRequest) -> MandateRequest {
    let text = |value: &Option<String>| value.as_deref().unwrap_or("").trim().to_string();
    let country_code = match request.address_country.trim() {
        "" => "GB".to_string(),
        country => country.to_uppercase(),
    };

    MandateRequest {
        email: request.normalized_email(),
        given_name: request.first_name.trim().to_string(),
        family_name: request.last_name.trim().to_string(),
        address_line1: request.address_line1.trim().to_string(),
        city: request.address_city.trim().to_string(),
        postal_code: request.address_postcode.trim().to_string(),
        country_code,
        account_holder_name: text(&request.dd_account_holder_name),
        account_number: digits(&text(&request.dd_account_number)),
        branch_code: digits(&text(&request.dd_sort_code)),
        session_token: request.session_token.trim().to_string(),
    }
}

/// Sort codes arrive as `20-00-00` or `20 00 00`.
fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gocardless::MockMandateProvider;
    use crate::domain::join::fixtures::direct_debit_request;

    #[tokio::test]
    async fn reuses_mandate_inside_window() {
        let provider = MockMandateProvider::new();
        provider.add_mandate("a@b.com", Utc::now() - Duration::seconds(60), "MD_OLD");

        let outcome = ensure_mandate(&provider, &direct_debit_request(), Duration::seconds(300))
            .await
            .unwrap();
        assert!(matches!(outcome, MandateOutcome::Reused(_)));
        assert_eq!(outcome.record().id, "MD_OLD");
        assert_eq!(provider.create_calls(), 0);
    }

    #[tokio::test]
    async fn creates_mandate_when_previous_is_outside_window() {
        let provider = MockMandateProvider::new();
        provider.add_mandate("a@b.com", Utc::now() - Duration::seconds(900), "MD_OLD");

        let outcome = ensure_mandate(&provider, &direct_debit_request(), Duration::seconds(300))
            .await
            .unwrap();
        assert!(matches!(outcome, MandateOutcome::Created(_)));
        assert_eq!(provider.create_calls(), 1);
    }

    #[test]
    fn sort_code_is_normalised() {
        let mut request = direct_debit_request();
        request.dd_sort_code = Some("20-00-00".to_string());
        request.address_country = String::new();
        let mandate = mandate_request(&request);
        assert_eq!(mandate.branch_code, "200000");
        assert_eq!(mandate.country_code, "GB");
    }
}
