//! Yahoo fundamentals provider against a mock HTTP server.

use fundetl_core::data::provider::{Credentials, DataError, Frequency, StatementRequest};
use fundetl_core::{EtlBase, IncomeStatementEtl, StatementEtl, StatementProvider, YahooFundamentalsProvider};
use mockito::Matcher;
use std::time::Duration;

const ITEMS: &[&str] = &["TotalRevenue", "NetIncome"];

fn request() -> StatementRequest<'static> {
    StatementRequest {
        line_items: ITEMS,
        frequency: Frequency::Quarterly,
        trailing: false,
    }
}

fn body(symbol: &str, date: &str, revenue: f64) -> String {
    format!(
        r#"{{"timeseries":{{"result":[
            {{"meta":{{"symbol":["{symbol}"],"type":["quarterlyTotalRevenue"]}},
              "quarterlyTotalRevenue":[{{"asOfDate":"{date}","periodType":"3M","currencyCode":"USD","reportedValue":{{"raw":{revenue},"fmt":"x"}}}}]}},
            {{"meta":{{"symbol":["{symbol}"],"type":["quarterlyNetIncome"]}}}}
        ],"error":null}}}}"#
    )
}

fn path_for(symbol: &str) -> Matcher {
    Matcher::Regex(format!(
        "^/ws/fundamentals-timeseries/v1/finance/timeseries/{symbol}$"
    ))
}

fn provider(server: &mockito::Server) -> YahooFundamentalsProvider {
    YahooFundamentalsProvider::new(server.url(), Duration::from_secs(5)).unwrap()
}

#[test]
fn fetches_each_symbol_with_basic_auth() {
    let mut server = mockito::Server::new();
    let jpm = server
        .mock("GET", path_for("JPM"))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "JPM".into()),
            Matcher::UrlEncoded(
                "type".into(),
                "quarterlyTotalRevenue,quarterlyNetIncome".into(),
            ),
            Matcher::UrlEncoded("period1".into(), "493590046".into()),
        ]))
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body("JPM", "2022-03-31", 30717000000.0))
        .create();
    let gs = server
        .mock("GET", path_for("GS"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body("GS", "2021-12-31", 12641000000.0))
        .create();

    let result = provider(&server)
        .fetch_statement(&["JPM", "GS"], &request(), &Credentials::new("analyst", "secret"))
        .unwrap();

    jpm.assert();
    gs.assert();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].symbol, "JPM");
    assert_eq!(result.rows[1].symbol, "GS");
    assert_eq!(
        result.rows[1].values.get("TotalRevenue"),
        Some(&12_641_000_000.0)
    );
    assert_eq!(result.line_items, vec!["TotalRevenue", "NetIncome"]);
}

#[test]
fn unauthorized_maps_to_auth_error() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", path_for("JPM"))
        .match_query(Matcher::Any)
        .with_status(401)
        .create();

    let err = provider(&server)
        .fetch_statement(&["JPM"], &request(), &Credentials::new("analyst", "wrong"))
        .unwrap_err();
    assert!(err.is_auth());
}

#[test]
fn server_error_maps_to_http_status() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", path_for("JPM"))
        .match_query(Matcher::Any)
        .with_status(502)
        .create();

    let err = provider(&server)
        .fetch_statement(&["JPM"], &request(), &Credentials::new("analyst", "secret"))
        .unwrap_err();
    assert!(matches!(err, DataError::HttpStatus { status: 502, .. }));
}

#[test]
fn garbage_body_is_format_change() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", path_for("JPM"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>consent</html>")
        .create();

    let err = provider(&server)
        .fetch_statement(&["JPM"], &request(), &Credentials::new("analyst", "secret"))
        .unwrap_err();
    assert!(matches!(err, DataError::ResponseFormatChanged(_)));
}

#[test]
fn all_symbols_empty_is_an_error() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", path_for("SIVBQ"))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"timeseries":{"result":[],"error":null}}"#)
        .create();

    let err = provider(&server)
        .fetch_statement(&["SIVBQ"], &request(), &Credentials::new("analyst", "secret"))
        .unwrap_err();
    assert!(matches!(err, DataError::ResponseFormatChanged(_)));
}

#[test]
fn network_failure_leaves_no_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    // Nothing listens on the discard port.
    let provider =
        YahooFundamentalsProvider::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let etl = IncomeStatementEtl::new(
        EtlBase::new(dir.path().join("data_lake")),
        Box::new(provider),
        Credentials::new("analyst", "secret"),
    );

    let err = etl.extract(&["JPM".to_string()], None).unwrap_err();
    assert!(matches!(
        err,
        fundetl_core::EtlError::Upstream(DataError::NetworkUnreachable(_))
    ));
    assert!(!etl.default_raw_path().exists());
}
