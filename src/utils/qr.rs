use rand::Rng;

/// Code QR opaque imprimé sur l'équipement ou le diplôme (24 caractères hexadécimaux)
pub fn generate_qr_code() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill(&mut bytes);
    hex::encode_upper(bytes)
}
