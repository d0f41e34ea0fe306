use crate::wire::PlantRecord;

/// Reply used in place of a chat prompt when the gallery is empty. Callers
/// must not send it to a provider.
pub const NO_PLANTS_REPLY: &str = "I apologize, but I don't see any plants in your gallery to provide information about. Please add some plants first!";

pub fn build_identification_prompt() -> &'static str {
    "Analyze this plant image and provide: 1) Common name, 2) Scientific name, 3) Brief description, 4) Basic care instructions (watering, sunlight, soil)"
}

fn plant_block(index: usize, plant: &PlantRecord) -> String {
    format!(
        "Plant {n}:\n- Name: {name}\n- Scientific Name: {sci}\n- Description: {desc}\n- Care Instructions: {care}\n",
        n = index + 1,
        name = plant.name,
        sci = plant.scientific_name,
        desc = plant.description,
        care = plant.care.join(", "),
    )
}

/// Chat prompt over the whole gallery. The question is embedded as typed.
pub fn build_chat_prompt(plants: &[PlantRecord], question: &str) -> String {
    if plants.is_empty() {
        return NO_PLANTS_REPLY.to_string();
    }

    let context = plants
        .iter()
        .enumerate()
        .map(|(i, p)| plant_block(i, p))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
r#"You are a helpful plant expert assistant. You have access to the following plants in the user's gallery:

{context}
User Question: "{question}"

Please provide a detailed but concise response focusing on:
1. Specific information about the plants in their gallery
2. Care tips and recommendations
3. Common issues and solutions
4. Interesting facts when relevant

If the question isn't about plants in their gallery, politely mention you can only discuss plants they've identified."#
    )
}
