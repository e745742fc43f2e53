/**
 * RENDU HTML - Pages du tableau de bord CCU
 *
 * RÔLE :
 * Fonctions pures : état de session → HTML. Aucun accès disque ni réseau,
 * le module http se contente d'emballer les chaînes dans une réponse.
 *
 * PAGES :
 * - login_page     : saisie des initiales
 * - dashboard_page : tableau de synthèse + un onglet par CCU (clé = description)
 * - error_page     : échec du store remonté à l'utilisateur
 */

use crate::models::{Answer, CcuRecord, Table, CSV_HEADERS};

pub const PAGE_TITLE: &str = "Gestión de CCUs Sarriguren";

/// Couleur de fond d'une CCU disponible
pub const AVAILABLE_COLOR: &str = "#DBF1D8";
/// Couleur de fond d'une CCU non disponible
pub const UNAVAILABLE_COLOR: &str = "#F1D8D8";

const STYLE: &str = r#"
    body { font-family: sans-serif; margin: 0; }
    .block-container { padding: 1rem 2rem; }
    table.overview { border-collapse: collapse; width: 100%; margin-bottom: 1.5rem; }
    table.overview th, table.overview td {
        border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left;
    }
    nav.tabs { display: flex; gap: 0.25rem; border-bottom: 1px solid #ccc; margin-bottom: 1rem; }
    nav.tabs a { padding: 0.4rem 0.8rem; text-decoration: none; color: #333; }
    nav.tabs a.active { border-bottom: 2px solid #ff4b4b; color: #ff4b4b; }
    .success { background: #DBF1D8; padding: 0.6rem; margin-bottom: 1rem; }
    .error { background: #F1D8D8; padding: 0.6rem; margin-bottom: 1rem; }
    form label { display: block; margin-top: 0.6rem; }
    form button { margin-top: 1rem; }
"#;

/// Règle de couleur du tableau de synthèse
pub fn availability_style(available: Answer) -> String {
    let color = match available {
        Answer::Yes => AVAILABLE_COLOR,
        Answer::No => UNAVAILABLE_COLOR,
    };
    format!("background-color: {color}")
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{PAGE_TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <div class=\"block-container\">\n<h1>{PAGE_TITLE}</h1>\n{body}</div>\n</body>\n</html>\n"
    )
}

pub fn login_page() -> String {
    layout(
        "<h3>Introduce tus iniciales para continuar</h3>\n\
         <form method=\"post\" action=\"/login\">\n\
         <label for=\"initials\">Iniciales</label>\n\
         <input type=\"text\" id=\"initials\" name=\"initials\" autofocus>\n\
         <button type=\"submit\">Continuar</button>\n\
         </form>\n",
    )
}

pub fn error_page(message: &str) -> String {
    layout(&format!(
        "<div class=\"error\">{}</div>\n<a href=\"/\">Volver</a>\n",
        escape_html(message)
    ))
}

fn overview_table(table: &Table) -> String {
    let mut html = String::from("<table class=\"overview\">\n<thead><tr>");
    for header in CSV_HEADERS {
        html.push_str(&format!("<th>{header}</th>"));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    for record in table {
        html.push_str(&format!("<tr style=\"{}\">", availability_style(record.available)));
        for cell in [
            record.unit_group.as_str(),
            record.description.as_str(),
            record.ip_address.as_str(),
            record.available.as_str(),
            record.firmware_version.as_str(),
            record.reset_firmware_requested.as_str(),
            record.last_modified_by.as_str(),
        ] {
            html.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html
}

/// Liste déroulante limitée aux deux valeurs Si / No
fn answer_select(name: &str, label: &str, current: Answer) -> String {
    let mut html =
        format!("<label for=\"{name}\">{label}</label>\n<select id=\"{name}\" name=\"{name}\">");
    for option in Answer::ALL {
        let selected = if option == current { " selected" } else { "" };
        html.push_str(&format!("<option value=\"{option}\"{selected}>{option}</option>"));
    }
    html.push_str("</select>\n");
    html
}

fn text_input(name: &str, label: &str, value: &str) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\n\
         <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\">\n",
        escape_html(value)
    )
}

fn edit_form(index: usize, record: &CcuRecord) -> String {
    let mut html = format!(
        "<section class=\"tab-panel\">\n<p>Actualizar estado para {}:</p>\n\
         <form method=\"post\" action=\"/records/{index}\">\n",
        escape_html(&record.description)
    );
    html.push_str(&text_input("ip_address", "IP Address", &record.ip_address));
    html.push_str(&answer_select("available", "Disponible", record.available));
    html.push_str(&text_input(
        "firmware_version",
        "Firmware Version (FW)",
        &record.firmware_version,
    ));
    html.push_str(&answer_select(
        "reset_firmware_requested",
        "Restablecer FW",
        record.reset_firmware_requested,
    ));
    html.push_str("<button type=\"submit\">Actualizar estado</button>\n</form>\n</section>\n");
    html
}

/// Tableau de bord complet. `selected` hors limites retombe sur le premier onglet.
pub fn dashboard_page(user: &str, table: &Table, selected: usize, flash: Option<&str>) -> String {
    let selected = if selected < table.len() { selected } else { 0 };

    let mut body = format!("<p class=\"user\">Usuario: {}</p>\n", escape_html(user));
    if let Some(message) = flash {
        body.push_str(&format!("<div class=\"success\">{}</div>\n", escape_html(message)));
    }
    body.push_str(&overview_table(table));

    if let Some(record) = table.get(selected) {
        body.push_str("<nav class=\"tabs\">\n");
        for (i, r) in table.iter().enumerate() {
            let class = if i == selected { "tab active" } else { "tab" };
            body.push_str(&format!(
                "<a class=\"{class}\" href=\"/?tab={i}\">{}</a>\n",
                escape_html(&r.description)
            ));
        }
        body.push_str("</nav>\n");
        body.push_str(&edit_form(selected, record));
    }

    layout(&body)
}
