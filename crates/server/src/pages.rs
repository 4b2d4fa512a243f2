//! Minimal inline HTML for the admin and brew pages. Content is rendered
//! server-side with plain string building; every dynamic value goes through
//! [`escape`].

use teashelf_core::{BrewPick, Location, LocationSummary, TeaInventory};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} — teashelf</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

/// The admin page: the tea table with per-location amounts wrapped in the
/// bulk-update form, plus the add-tea and add-location forms.
pub fn admin(teas: &[TeaInventory], locations: &[Location]) -> String {
    let mut body = String::new();
    body.push_str("<h1>teashelf</h1>\n<p><a href=\"/brew\">brew</a></p>\n");

    body.push_str("<h2>Teas</h2>\n<form method=\"post\" action=\"/\">\n<table>\n<tr>");
    for header in ["Name", "Type", "Dose (g)", "Notes", "Seller", "Price/g", "Bought (g)"] {
        body.push_str(&format!("<th>{header}</th>"));
    }
    for location in locations {
        body.push_str(&format!("<th>{}</th>", escape(&location.name)));
    }
    body.push_str("<th></th></tr>\n");

    for entry in teas {
        let tea = &entry.tea;
        let id = tea.id;
        body.push_str("<tr>");
        body.push_str(&format!(
            "<td><input name=\"name_{id}\" value=\"{}\"></td>",
            escape(&tea.name)
        ));
        body.push_str(&format!(
            "<td><input name=\"type_{id}\" value=\"{}\"></td>",
            escape(&tea.kind)
        ));
        body.push_str(&format!(
            "<td><input name=\"dose_{id}\" value=\"{}\"></td>",
            tea.default_dose
        ));
        body.push_str(&format!(
            "<td><textarea name=\"notes_{id}\">{}</textarea></td>",
            escape(&tea.notes)
        ));
        body.push_str(&format!(
            "<td><input name=\"seller_{id}\" value=\"{}\"></td>",
            escape(&tea.seller)
        ));
        body.push_str(&format!(
            "<td><input name=\"price_{id}\" value=\"{}\"></td>",
            tea.price_per_gram
        ));
        body.push_str(&format!(
            "<td><input name=\"grams_bought_{id}\" value=\"{}\"></td>",
            tea.grams_bought
        ));
        for location in locations {
            body.push_str(&format!(
                "<td><input name=\"location_{}_{id}\" value=\"{}\"></td>",
                location.id,
                entry.amount_at(location.id)
            ));
        }
        body.push_str(&format!(
            "<td><button name=\"remove_tea\" value=\"{id}\">remove</button></td>"
        ));
        body.push_str("</tr>\n");
    }
    body.push_str(
        "</table>\n<button name=\"update_tea\" value=\"1\">Update all teas</button>\n</form>\n",
    );

    body.push_str(
        "<h2>Add tea</h2>\n<form method=\"post\" action=\"/\">\n\
         <label>Name <input name=\"name\"></label>\n\
         <label>Type <input name=\"type\"></label>\n\
         <label>Dose (g) <input name=\"dose\"></label>\n\
         <label>Notes <textarea name=\"notes\"></textarea></label>\n\
         <label>Seller <input name=\"seller\"></label>\n\
         <label>Price/g <input name=\"price\"></label>\n\
         <label>Bought (g) <input name=\"grams_bought\"></label>\n\
         <button name=\"add_tea\" value=\"1\">Add tea</button>\n</form>\n",
    );

    body.push_str(
        "<h2>Add location</h2>\n<form method=\"post\" action=\"/\">\n\
         <label>Name <input name=\"location_name\"></label>\n\
         <label>Description <input name=\"location_desc\"></label>\n\
         <button name=\"add_location\" value=\"1\">Add location</button>\n</form>\n",
    );

    layout("admin", &body)
}

pub fn brew_landing() -> String {
    let body = "<h1>Brew tea</h1>\n\
                <form method=\"post\" action=\"/brew\">\n\
                <button type=\"submit\">Start</button>\n</form>\n\
                <p><a href=\"/\">admin</a></p>"
        .to_string();
    layout("brew", &body)
}

pub fn select_location(summaries: &[LocationSummary]) -> String {
    let mut body = String::new();
    body.push_str("<h1>Where are you?</h1>\n<form method=\"post\" action=\"/select_location\">\n");
    body.push_str("<select name=\"location\">\n");
    for summary in summaries {
        body.push_str(&format!(
            "<option value=\"{}\">{} — {} teas</option>\n",
            summary.id,
            escape(&summary.description),
            summary.tea_count
        ));
    }
    body.push_str("</select>\n<button type=\"submit\">Choose</button>\n</form>\n");
    layout("select location", &body)
}

pub fn brew_result(location: &Location, pick: Option<&BrewPick>) -> String {
    let body = match pick {
        Some(pick) => {
            let mut body = format!(
                "<h1>{} at {}</h1>\n<p>{} — {} g left, {} g per brew</p>\n",
                escape(&pick.name),
                escape(&location.description),
                escape(&pick.kind),
                pick.amount,
                pick.dose()
            );
            if !pick.notes.is_empty() {
                body.push_str(&format!("<pre>{}</pre>\n", escape(&pick.notes)));
            }
            body.push_str(&format!(
                "<form method=\"post\" action=\"/brew_result/{}\">\n\
                 <label>Review <textarea name=\"review\"></textarea></label>\n\
                 <button type=\"submit\">Brewed it</button>\n</form>\n",
                location.id
            ));
            body
        }
        None => format!(
            "<h1>Nothing left at {}</h1>\n\
             <p>No tea with any amount remains here.</p>\n\
             <p><a href=\"/select_location\">pick another location</a></p>\n",
            escape(&location.description)
        ),
    };
    layout("brew result", &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        "<h1>Something went wrong</h1>\n<p>{}</p>\n<p><a href=\"/\">back</a></p>",
        escape(message)
    );
    layout("error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<b>\"tea\" & 'more'</b>"),
            "&lt;b&gt;&quot;tea&quot; &amp; &#39;more&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn admin_page_names_form_fields_per_tea() {
        use teashelf_core::Tea;
        let entry = TeaInventory {
            tea: Tea {
                id: 7,
                name: "sencha".to_string(),
                kind: "green".to_string(),
                default_dose: 4.0,
                notes: String::new(),
                seller: String::new(),
                price_per_gram: 0.0,
                grams_bought: 100.0,
                created_at: String::new(),
            },
            amounts: [(2, 25.0)].into_iter().collect(),
        };
        let locations = vec![Location {
            id: 2,
            name: "home".to_string(),
            description: "Home".to_string(),
        }];
        let html = admin(&[entry], &locations);
        assert!(html.contains("name=\"name_7\""));
        assert!(html.contains("name=\"dose_7\""));
        assert!(html.contains("name=\"location_2_7\""));
        assert!(html.contains("value=\"25\""));
        assert!(html.contains("name=\"remove_tea\" value=\"7\""));
    }
}
