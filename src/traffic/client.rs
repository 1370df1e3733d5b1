use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::models::{Deviation, RawDeviation, TrafikverketResponse};
use super::{DeviationSource, TrafficError, counties};
use crate::config::AppConfig;

/// Client for the Trafikverket data API. Queries are authenticated XML
/// documents POSTed to a single endpoint; responses come back as JSON.
///
/// Pure read adapter: no retries, no caching. Every request uses the
/// client-wide bounded timeout.
pub struct TrafikverketClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl TrafikverketClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_url: config.trafikverket_api_url.clone(),
            api_key: config.trafikverket_api_key.clone(),
        })
    }

    async fn query(&self, filter_xml: &str) -> Result<Vec<RawDeviation>, TrafficError> {
        let body = situation_query(&self.api_key, filter_xml);

        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrafficError::UpstreamStatus(status));
        }

        let parsed: TrafikverketResponse = response.json().await?;
        Ok(parsed
            .response
            .result
            .into_iter()
            .flat_map(|result| result.situations)
            .flat_map(|situation| situation.deviations)
            .collect())
    }
}

#[async_trait]
impl DeviationSource for TrafikverketClient {
    async fn fetch_deviations(&self, county_no: i32) -> Result<Vec<Deviation>, TrafficError> {
        if !counties::is_known(county_no) {
            return Err(TrafficError::InvalidRegion(county_no));
        }

        let filter = format!(
            r#"<AND>
                <EXISTS name="Deviation" value="true" />
                <EQ name="Deviation.CountyNo" value="{county_no}" />
                <IN name="Deviation.MessageTypeValue" value="Accident,Roadwork" />
            </AND>"#
        );

        let raw = self.query(&filter).await?;
        Ok(raw
            .into_iter()
            .filter_map(|deviation| deviation.normalize(Some(county_no)))
            .collect())
    }

    async fn fetch_deviation_by_id(&self, id: &str) -> Result<Option<Deviation>, TrafficError> {
        let filter = format!(
            r#"<AND>
                <EXISTS name="Deviation" value="true" />
                <EQ name="Deviation.Id" value="{}" />
            </AND>"#,
            xml_escape(id)
        );

        let raw = self.query(&filter).await?;
        Ok(raw
            .into_iter()
            .filter_map(|deviation| deviation.normalize(None))
            .next())
    }
}

/// The full query document. Ordered newest first so the poll loop processes
/// fresh deviations before old ones.
fn situation_query(api_key: &str, filter_xml: &str) -> String {
    format!(
        r#"<REQUEST>
    <LOGIN authenticationkey="{api_key}" />
    <QUERY objecttype="Situation" namespace="Road.TrafficInfo" schemaversion="1.5" orderby="Deviation.CreationTime DESC">
        <FILTER>
            {filter_xml}
        </FILTER>
        <INCLUDE>Deviation.Id</INCLUDE>
        <INCLUDE>Deviation.Header</INCLUDE>
        <INCLUDE>Deviation.Message</INCLUDE>
        <INCLUDE>Deviation.MessageTypeValue</INCLUDE>
        <INCLUDE>Deviation.CountyNo</INCLUDE>
        <INCLUDE>Deviation.CreationTime</INCLUDE>
    </QUERY>
</REQUEST>"#
    )
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/test".to_string(),
            trafikverket_api_url: "http://127.0.0.1:9/data.json".to_string(),
            trafikverket_api_key: "test-key".to_string(),
            sms_gateway_url: "http://127.0.0.1:9/sms".to_string(),
            email_gateway_url: "http://127.0.0.1:9/email".to_string(),
            gateway_api_key: "secret".to_string(),
            sms_sender_name: "TrafikInfo".to_string(),
            http_addr: "127.0.0.1:8080".parse().unwrap(),
            poll_interval: Duration::from_secs(600),
            poll_channels: vec![crate::notifications::Channel::Sms],
            request_timeout: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn unknown_county_fails_before_any_network_call() {
        // Port 9 is the discard service; reaching the network would hang or
        // error differently, so a fast InvalidRegion proves the pre-check.
        let client = TrafikverketClient::new(&test_config()).unwrap();
        let err = client.fetch_deviations(2).await.unwrap_err();
        assert!(matches!(err, TrafficError::InvalidRegion(2)));
    }

    #[test]
    fn query_document_carries_key_and_filter() {
        let query = situation_query("abc123", "<EQ name=\"Deviation.CountyNo\" value=\"1\" />");
        assert!(query.contains("authenticationkey=\"abc123\""));
        assert!(query.contains("objecttype=\"Situation\""));
        assert!(query.contains("orderby=\"Deviation.CreationTime DESC\""));
        assert!(query.contains("Deviation.CountyNo"));
    }

    #[test]
    fn deviation_ids_are_escaped_in_filters() {
        assert_eq!(xml_escape("a\"b<c>&'"), "a&quot;b&lt;c&gt;&amp;&apos;");
    }
}
