// Fixed instruction sent with every résumé. The rubric weights and the JSON
// shape must stay in sync with `report::AssembledReport`.

/// Scoring rubric and output contract for the evaluation call.
pub const EVALUATION_PROMPT: &str = r#"Eres un evaluador experto de currículums del sector tecnológico. Analiza el currículum adjunto y puntúalo con estos criterios:

1. HABILIDADES TÉCNICAS (25 puntos): lenguajes, frameworks, herramientas cloud y DevOps, bases de datos, metodologías ágiles.
2. EXPERIENCIA PROFESIONAL (25 puntos): años relevantes, progresión, logros cuantificables, responsabilidades técnicas.
3. PROYECTOS Y CONTRIBUCIONES (20 puntos): proyectos propios, código abierto, portafolio, complejidad.
4. COMPATIBILIDAD ATS (15 puntos): formato limpio, palabras clave, estructura de secciones, legibilidad automática.
5. PRESENTACIÓN PROFESIONAL (10 puntos): diseño, organización, datos de contacto, ortografía, longitud.
6. FORMACIÓN Y CERTIFICACIONES (5 puntos): formación relevante, certificaciones, aprendizaje continuo.

Extrae el nombre completo de la persona. Si no aparece un nombre claro, usa "Candidato".

Responde únicamente con un objeto JSON con esta estructura exacta:

{
  "candidateName": "Nombre completo",
  "overallScore": 0,
  "technicalSkillsScore": 0,
  "experienceScore": 0,
  "projectsScore": 0,
  "atsCompatibilityScore": 0,
  "presentationScore": 0,
  "educationScore": 0,
  "strengths": ["Fortaleza 1", "Fortaleza 2", "Fortaleza 3"],
  "weaknesses": ["Debilidad 1", "Debilidad 2", "Debilidad 3"],
  "recommendations": ["Recomendación 1", "Recomendación 2", "Recomendación 3", "Recomendación 4"],
  "technicalAnalysis": "Análisis de competencias técnicas y nivel de actualización",
  "marketComparison": "Comparación con las expectativas actuales del mercado"
}

Todas las puntuaciones deben ser números enteros entre 0 y 100. El análisis debe ser específico, constructivo y basado en evidencia del currículum."#;

/// Appended to the rubric so narrative fields come back in the user's language.
pub fn language_instruction(language: &str) -> String {
    format!("Redacta todos los textos del JSON en el idioma con código '{language}'.")
}

/// Full instruction text for one evaluation.
pub fn build_instruction(language: &str) -> String {
    format!("{EVALUATION_PROMPT}\n\n{}", language_instruction(language))
}
