//! High open-interest options through the gateway.

use gateway_client::{Error, OptionType};
use gateway_tests::{spawn_gateway, test_config};
use mockito::Matcher;

const CONTRACTS: &str = r#"{"option_contracts":[
    {"symbol":"AAPL1","expiration_date":"2030-01-18","type":"put","open_interest":"12"},
    {"symbol":"AAPL2","expiration_date":"2030-01-18","type":"put","open_interest":340},
    {"symbol":"AAPL3","expiration_date":"2030-01-18","type":"put"}
],"next_page_token":null}"#;

#[tokio::test]
async fn test_best_contract_per_window() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("GET", "/v2/options/contracts")
        .match_header("APCA-API-KEY-ID", "test-key")
        .match_header("APCA-API-SECRET-KEY", "test-secret")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("underlying_symbol".into(), "AAPL".into()),
            Matcher::UrlEncoded("type".into(), "put".into()),
            Matcher::UrlEncoded("status".into(), "active".into()),
        ]))
        .with_status(200)
        .with_body(CONTRACTS)
        .expect(2)
        .create_async()
        .await;

    let client = spawn_gateway(test_config(&upstream.url())).await.unwrap();
    let response = client
        .get_high_open_interest("aapl", OptionType::Put)
        .await
        .expect("options");

    assert_eq!(response.ticker, "AAPL");
    assert_eq!(response.option_type, OptionType::Put);
    assert_eq!(response.short_term.unwrap().symbol, "AAPL2");
    assert_eq!(response.leap.unwrap().open_interest.as_deref(), Some("340"));
    assert!(response.error.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unknown_underlying_is_bad_request() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("GET", "/v2/options/contracts")
        .match_query(Matcher::Any)
        .with_status(422)
        .with_body(r#"{"message":"invalid underlying_symbol"}"#)
        .create_async()
        .await;

    let client = spawn_gateway(test_config(&upstream.url())).await.unwrap();
    let err = client
        .get_high_open_interest("NOPE", OptionType::Call)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidRequest(ref m) if m == "Invalid ticker symbol: NOPE"));
}

#[tokio::test]
async fn test_missing_credentials_is_server_error() {
    let mut config = test_config("http://127.0.0.1:9");
    config.upstream.alpaca_key_id.clear();
    let client = spawn_gateway(config).await.unwrap();

    let err = client
        .get_high_open_interest("AAPL", OptionType::Call)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, ref code, .. } if code == "INTERNAL_ERROR"));
}
