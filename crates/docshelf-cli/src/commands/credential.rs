//! Credential command handlers

use anyhow::Result;

use docshelf_core::CredentialStatus;

use super::Shelf;
use crate::output::Output;

/// Show the saved credential and its status
pub fn show(shelf: &Shelf, output: &Output) -> Result<()> {
    let gate = shelf.credential_gate()?;
    output.print_credential(&gate.state());
    Ok(())
}

/// Save a new credential and validate it
pub async fn set(shelf: &Shelf, value: String, output: &Output) -> Result<()> {
    let gate = shelf.credential_gate()?;
    gate.save(value.trim())?;
    gate.validate_current().await?;

    report(gate.status(), output);
    output.print_credential(&gate.state());
    Ok(())
}

/// Validate the saved credential
pub async fn validate(shelf: &Shelf, output: &Output) -> Result<()> {
    let gate = shelf.credential_gate()?;
    gate.validate_current().await?;

    report(gate.status(), output);
    output.print_credential(&gate.state());
    Ok(())
}

fn report(status: CredentialStatus, output: &Output) {
    match status {
        CredentialStatus::Valid => output.success("Credential is valid"),
        _ => output.message("Credential was not accepted"),
    }
}
