//! Blocking network executor for hosts without their own HTTP stack. The
//! engine itself never does IO; this crate services its `Fetch` commands
//! inline with ureq and feeds the completions straight back.

use engine::{Engine, EngineCommand, FetchBody, FetchRequest, FetchResponse};

/// Execute one fetch. Non-2xx statuses are regular responses, not errors;
/// only transport failures map to `Err`.
pub fn execute(request: &FetchRequest) -> Result<FetchResponse, String> {
    let mut call = ureq::request(request.method.as_str(), &request.url);
    for (name, value) in &request.headers {
        call = call.set(name, value);
    }
    let result = match &request.body {
        Some(FetchBody::Json(json)) => call.send_string(json),
        Some(FetchBody::Form(fields)) => {
            let pairs: Vec<(&str, &str)> = fields
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            call.send_form(&pairs)
        }
        None => call.call(),
    };
    match result {
        Ok(response) => convert(response),
        Err(ureq::Error::Status(_, response)) => convert(response),
        Err(ureq::Error::Transport(err)) => Err(err.to_string()),
    }
}

fn convert(response: ureq::Response) -> Result<FetchResponse, String> {
    let status = response.status();
    let mut headers = Vec::new();
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            headers.push((name.clone(), value.to_string()));
        }
    }
    let body = response.into_string().map_err(|err| err.to_string())?;
    Ok(FetchResponse {
        status,
        headers,
        body,
    })
}

/// Drive an engine synchronously: execute its fetches inline (completions
/// can issue follow-up fetches, so loop until quiet) and hand every other
/// command back to the caller.
pub fn service(engine: &mut Engine) -> Vec<EngineCommand> {
    let mut passthrough = Vec::new();
    loop {
        let commands = engine.drain_commands();
        if commands.is_empty() {
            return passthrough;
        }
        for command in commands {
            match command {
                EngineCommand::Fetch(request) => {
                    log::debug!("{} {}", request.method.as_str(), request.url);
                    let id = request.id;
                    let result = execute(&request);
                    engine.complete_fetch(id, result);
                }
                // fetches run inline; nothing to cancel
                EngineCommand::CancelFetch(_) => {}
                other => passthrough.push(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_responses_with_headers_and_body() {
        let response = ureq::Response::new(201, "Created", "<div>done</div>").unwrap();
        let converted = convert(response).unwrap();
        assert_eq!(converted.status, 201);
        assert_eq!(converted.body, "<div>done</div>");
    }
}
