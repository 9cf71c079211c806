use sismo_scrape::{
    error::ExtractionError,
    extract::Extractor,
    model::{Magnitude, RunStamp},
    render::RenderedPage,
};

const PAGE_URL: &str = "https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados";

fn page(rows: &str) -> RenderedPage {
    RenderedPage {
        url: PAGE_URL.to_string(),
        html: format!(
            "<html><body><table><thead><tr><th>Reporte</th></tr></thead><tbody>{rows}</tbody></table></body></html>"
        ),
    }
}

fn extractor() -> Extractor {
    Extractor::new("table tbody", "table tbody tr").unwrap()
}

fn run() -> RunStamp {
    RunStamp::from_unix_millis(1_704_103_200_000).unwrap()
}

#[test]
fn keeps_full_rows_and_drops_short_ones() {
    let p = page(
        r#"<tr><td>R1</td><td>Lima</td><td>2024-01-01 10:00</td><td>4.5</td><td><a href=https://x/1>ver</a></td></tr>
           <tr><td>R2</td><td>Cusco</td><td>2024-01-01 11:00</td><td>N/D</td><td></td></tr>
           <tr><td>bad</td><td>only two cells</td></tr>"#,
    );
    let reports = extractor().extract(&p, &run()).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].report_label, "R1");
    assert_eq!(reports[0].reference, "Lima");
    assert_eq!(reports[0].local_datetime, "2024-01-01 10:00");
    assert_eq!(reports[0].magnitude, Magnitude::Number(4.5));
    assert_eq!(reports[0].report_link, "https://x/1");

    assert_eq!(reports[1].report_label, "R2");
    assert_eq!(reports[1].magnitude, Magnitude::Text("N/D".into()));
    assert_eq!(reports[1].report_link, "");

    assert_eq!(reports[0].scraped_at, reports[1].scraped_at);
    assert_eq!(reports[0].scraped_at, "2024-01-01T10:00:00Z");
}

#[test]
fn blank_cells_become_empty_strings() {
    let p = page("<tr><td>   </td><td>\n\t</td><td></td><td> </td><td><span>no link</span></td></tr>");
    let reports = extractor().extract(&p, &run()).unwrap();

    assert_eq!(reports.len(), 1);
    let r = &reports[0];
    assert_eq!(r.report_label, "");
    assert_eq!(r.reference, "");
    assert_eq!(r.local_datetime, "");
    assert_eq!(r.magnitude, Magnitude::Text(String::new()));
    assert_eq!(r.report_link, "");
}

#[test]
fn rows_with_extra_cells_are_kept() {
    let p = page("<tr><td>R9</td><td>Ica</td><td>d</td><td>3.1</td><td></td><td>extra</td></tr>");
    let reports = extractor().extract(&p, &run()).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].magnitude, Magnitude::Number(3.1));
}

#[test]
fn preserves_document_order() {
    let rows: String = (0..40)
        .map(|i| format!("<tr><td>R{i}</td><td>x</td><td>d</td><td>{i}.0</td><td></td></tr>"))
        .collect();
    let reports = extractor().extract(&page(&rows), &run()).unwrap();

    let labels: Vec<_> = reports.iter().map(|r| r.report_label.as_str()).collect();
    let expected: Vec<String> = (0..40).map(|i| format!("R{i}")).collect();
    assert_eq!(labels, expected);
}

#[test]
fn relative_links_resolve_against_the_page() {
    let p = page(
        r#"<tr><td>R1</td><td>Lima</td><td>d</td><td>4.0</td><td><a href="/ultimo-sismo/reporte/123">ver</a></td></tr>"#,
    );
    let reports = extractor().extract(&p, &run()).unwrap();
    assert_eq!(
        reports[0].report_link,
        "https://ultimosismo.igp.gob.pe/ultimo-sismo/reporte/123"
    );
}

#[test]
fn wrapped_text_is_collapsed() {
    let p = page(
        "<tr><td>IGP/CENSIS/RS\n   2024-0001</td><td>12 km al SO de\n  Lima</td><td>d</td><td> 5.2 </td><td></td></tr>",
    );
    let reports = extractor().extract(&p, &run()).unwrap();
    assert_eq!(reports[0].report_label, "IGP/CENSIS/RS 2024-0001");
    assert_eq!(reports[0].reference, "12 km al SO de Lima");
    assert_eq!(reports[0].magnitude, Magnitude::Number(5.2));
}

#[test]
fn unparsed_magnitude_keeps_its_inner_whitespace() {
    let p = page("<tr><td>R1</td><td>Lima</td><td>d</td><td> 4.5\n   Mw </td><td></td></tr>");
    let reports = extractor().extract(&p, &run()).unwrap();
    assert_eq!(reports[0].magnitude, Magnitude::Text("4.5\n   Mw".into()));
}

#[test]
fn magnitude_parses_the_whole_cell_or_keeps_text() {
    assert_eq!(Magnitude::parse("4.5 Mw"), Magnitude::Text("4.5 Mw".into()));
    assert_eq!(Magnitude::parse(" 6.2 "), Magnitude::Number(6.2));
    assert_eq!(Magnitude::parse("0"), Magnitude::Number(0.0));
    assert_eq!(Magnitude::parse("NaN"), Magnitude::Text("NaN".into()));
    assert_eq!(Magnitude::parse(""), Magnitude::Text(String::new()));
}

#[test]
fn empty_table_is_not_an_error() {
    let reports = extractor().extract(&page(""), &run()).unwrap();
    assert!(reports.is_empty());
}

#[test]
fn missing_table_is_an_error() {
    let p = RenderedPage {
        url: PAGE_URL.to_string(),
        html: "<html><body><p>Mantenimiento</p></body></html>".to_string(),
    };
    let err = extractor().extract(&p, &run()).unwrap_err();
    assert!(matches!(err, ExtractionError::TableMissing(_)));
}

#[test]
fn invalid_selector_is_rejected() {
    assert!(matches!(
        Extractor::new("table tbody", "tr[").err(),
        Some(ExtractionError::Selector(_))
    ));
}
