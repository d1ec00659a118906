//! Boleto DTOs

use serde::Deserialize;
use validator::Validate;

use core_kernel::LedgerEntryId;
use domain_billing::IssueBoletoRequest;

/// Body of `POST /boletos/emitir`
#[derive(Debug, Deserialize, Validate)]
pub struct EmitBoletoRequest {
    pub lancamento_id: LedgerEntryId,
    #[validate(length(min = 1, message = "servico is required"))]
    pub servico: String,
    #[validate(length(min = 1, message = "descricao_servico is required"))]
    pub descricao_servico: String,
}

impl From<EmitBoletoRequest> for IssueBoletoRequest {
    fn from(request: EmitBoletoRequest) -> Self {
        IssueBoletoRequest::new(
            request.lancamento_id,
            request.servico,
            request.descricao_servico,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_service_fails_validation() {
        let request: EmitBoletoRequest = serde_json::from_str(
            r#"{"lancamento_id": 7, "servico": "", "descricao_servico": "Sessão 1"}"#,
        )
        .unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("servico"));
    }

    #[test]
    fn test_converts_to_issue_request() {
        let request: EmitBoletoRequest = serde_json::from_str(
            r#"{"lancamento_id": 7, "servico": "Peeling", "descricao_servico": "Sessão 1"}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
        let issue = IssueBoletoRequest::from(request);
        assert_eq!(issue.ledger_entry_id, LedgerEntryId::new(7));
        assert_eq!(issue.service_name, "Peeling");
    }
}
