use std::io::Write;
use std::process::ExitCode;

use eyre::Result;
use tracing::error;

use crate::gemini_client::GeminiClient;

/// Report which Gemini models the configured key can chat with.
pub async fn check_models(output: &mut dyn Write) -> Result<ExitCode> {
    let client = match GeminiClient::new() {
        Ok(client) => client,
        Err(e) => {
            writeln!(output, "ERROR: {}", e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    writeln!(output, "API key found: {}", client.masked_key())?;
    report_models(&client, output).await
}

pub async fn report_models(client: &GeminiClient, output: &mut dyn Write) -> Result<ExitCode> {
    writeln!(output, "\nSearching for models available to this key...")?;
    writeln!(output, "------------------------------------------------")?;

    let models = match client.list_chat_models().await {
        Ok(models) => models,
        Err(e) => {
            error!("Model check failed: {:?}", e);
            writeln!(output, "\nCONNECTION ERROR: {}", e)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if models.is_empty() {
        writeln!(output, "No text models found. Check your API key.")?;
    }
    for model in &models {
        match &model.display_name {
            Some(display) => writeln!(output, "• {} ({})", model.name, display)?,
            None => writeln!(output, "• {}", model.name)?,
        }
    }

    writeln!(output, "------------------------------------------------")?;
    if !models.is_empty() {
        writeln!(output, "Copy one of the names above exactly (e.g. models/gemini-pro)")?;
    }
    Ok(ExitCode::SUCCESS)
}
