/// Replace the cedilla forms of s and t with the comma-below letters
/// Romanian uses. Windows-1250 only has the cedilla forms.
pub fn fold_cedillas(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ş' => 'ș',
            'Ş' => 'Ș',
            'ţ' => 'ț',
            'Ţ' => 'Ț',
            other => other,
        })
        .collect()
}
