// src/common/documents.rs

use std::borrow::Cow;
use validator::ValidationError;

/// Remove tudo que não for dígito ("529.982.247-25" -> "52998224725").
pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validação real de CPF: 11 dígitos, não todos iguais, e os dois
/// dígitos verificadores conferem.
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = only_digits(cpf)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 11 {
        return false;
    }
    // 00000000000, 11111111111 etc.
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let weight_start = len as u32 + 1;
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (weight_start - i as u32))
            .sum();
        let d = (sum * 10) % 11;
        if d == 10 { 0 } else { d }
    };

    check_digit(9) == digits[9] && check_digit(10) == digits[10]
}

/// DDD + número: 10 ou 11 dígitos.
pub fn is_valid_phone(phone: &str) -> bool {
    let len = only_digits(phone).len();
    (10..=11).contains(&len)
}

pub fn is_valid_cnpj_length(cnpj: &str) -> bool {
    only_digits(cnpj).len() == 14
}

// --- Validadores para o `validator` (#[validate(custom(...))]) ---

pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(cpf) {
        Ok(())
    } else {
        Err(ValidationError::new("cpf")
            .with_message(Cow::from("CPF inválido. Verifique e tente novamente.")))
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if is_valid_phone(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message(Cow::from("Telefone inválido. Use DDD + número (10 ou 11 dígitos).")))
    }
}

pub fn validate_cnpj(cnpj: &str) -> Result<(), ValidationError> {
    if is_valid_cnpj_length(cnpj) {
        Ok(())
    } else {
        Err(ValidationError::new("cnpj")
            .with_message(Cow::from("O CNPJ deve ter 14 dígitos.")))
    }
}
