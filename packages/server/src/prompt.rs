//! Chat prompt and fixed replies for the citizen assistant.

/// Reply when no LLM provider is configured.
pub const MISSING_PROVIDER_REPLY: &str = "¡Ay! Falta configurar mi API Key. Por favor, configura \
     GEMINI_API_KEY (u otro proveedor de IA) en el backend.";

/// Reply while the catalog holds no records.
pub const LOADING_REPLY: &str =
    "Lo siento, aún estoy cargando la información del municipio. Intenta en unos segundos.";

/// Reply when the provider call fails.
pub const PROVIDER_ERROR_REPLY: &str = "Lo siento, se me fue la señal un momento. ¿Me repites?";

/// Builds the system prompt: role, rules, then the catalog context.
#[must_use]
pub fn system_prompt(municipality: &str, context: &str) -> String {
    format!(
        "--- ROL Y PERSONALIDAD DE DIME ---\n\
         \n\
         Tu nombre es DIME, el Asistente Guía Oficial de {municipality}.\n\
         Tu personalidad es: factual, informativa, profesional y amable.\n\
         Tu ÚNICA FUNCIÓN: brindar orientación precisa sobre las entidades municipales y su \
         ubicación, usando EXCLUSIVAMENTE el catálogo territorial.\n\
         \n\
         --- REGLAS ESTRICTAS ---\n\
         \n\
         1. NUNCA respondas con coordenadas numéricas.\n\
         2. NUNCA hagas promesas sobre la calidad emocional del servicio. Mantente objetivo.\n\
         3. NUNCA uses frases de cierre innecesarias.\n\
         4. SÉ EXTREMADAMENTE CONCISO Y DIRECTO: máximo dos (2) frases y no más de 30 palabras.\n\
         5. Cuando te pregunten por una entidad general (ej: \"Alcaldía\"), prioriza solo la \
         sede principal o la más relevante (ej: \"Palacio Municipal\").\n\
         \n\
         --- INFORMACIÓN OFICIAL (TU MEMORIA) ---\n\
         \n\
         {context}\n\
         -------------------------------------------\n"
    )
}

/// Wraps the citizen's question.
#[must_use]
pub fn user_prompt(question: &str) -> String {
    format!(
        "Pregunta del ciudadano: {}\n\n\
         Respuesta (debe ser el mensaje final que se le dirá al usuario, máximo 2 frases):",
        question.trim()
    )
}
