//! Prompt templates for product titles and descriptions.

/// Placeholder the model is asked to use instead of a real brand.
pub const BRAND_PLACEHOLDER: &str = "[your brand name]";

/// Prompt asking for a product title derived from an image caption.
pub fn product_name_prompt(caption: &str) -> String {
    format!(
        "Generate a product title name based on the caption {caption} and following information. \
         Replace the brand name with {BRAND_PLACEHOLDER}. \
         Ensure the product title follows this format: {BRAND_PLACEHOLDER}  <Product Details>. \
         The product details should include features like product type and it must be something popular, \
         series name, purpose and any relevant specifics, removing any extra spaces. \
         Exclude any color and brand name from the product title, without any (:) and (,). \
         example: '{BRAND_PLACEHOLDER}T-Shirts Round Neck Cotton Full Sleeve'"
    )
}

/// Prompt asking for an "About this item" / "Product description" text.
///
/// `colors` are hex strings; `None` and an empty slice both mean no colors.
pub fn description_prompt(caption: &str, product_name: &str, colors: Option<&[String]>) -> String {
    let colors = colors.filter(|c| !c.is_empty());

    let color_statement = match colors {
        Some(colors) => {
            let list = quoted_list(colors);
            format!(
                "Include the following color details: exclude any colors in caption {caption}. \
                 Replace these hex codes {list} with color names. \
                 Only use colors in {list} as available colors. \
                 Display them as: `<strong>ColorName</strong>` \
                 at the final line without additional sentences."
            )
        }
        None => {
            "No colors provided. Focus on materials, fit, and benefits without using colors."
                .to_string()
        }
    };

    let colors_line = colors
        .map(|colors| {
            let strong: Vec<String> = colors
                .iter()
                .map(|c| format!("<strong>{}</strong>", c.to_uppercase()))
                .collect();
            format!("{}.</p>", strong.join(", "))
        })
        .unwrap_or_default();

    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "Generate a product description with the following sections: \
         \"About this item\" and \"Product description\".\n\n",
    );
    prompt.push_str("based on this information:\n");
    prompt.push_str(&format!("Caption: {caption}\n"));
    prompt.push_str(&format!("Product Title: {product_name}\n"));
    prompt.push_str(&color_statement);
    prompt.push_str("\n\n");
    prompt.push_str(REQUIREMENTS);
    prompt.push_str(EXAMPLE_OUTPUT);
    prompt.push_str(&format!("Available colors:  {colors_line}\n"));
    prompt.push_str(REMINDERS);
    prompt
}

const REQUIREMENTS: &str = "Important Requirements:\n\
1. Limit the description to exactly 150 words.\n\
2. Extract the brand name from the Product Title below and use it to reference the product within the description.\n\
3. Do not include brand details from the Caption below.\n\
4. Follow the structure provided below for \"About this item\" and \"Product description\".\n\
5. Ensure each line in the description contains two sentences, removing unnecessary spaces after periods (.).\n\
6. If colors are provided, include them as the last line in the description and format them using HTML `<strong>` tags.\n\n";

const EXAMPLE_OUTPUT: &str = "Expected Output Format:\n\n\
About this item\n\n\
. Genuine leather construction for lasting durability.\n\
. Multiple card slots and compartments for organization.\n\
. Sleek and sophisticated design for a polished look.\n\
. Compact size for easy carrying in pockets or bags.\n\
. Secure closure to protect your valuables.\n\
Product description\n\n\
The polo leather wallet offers a premium feel and functionality.It's crafted from high-quality leather, ensuring both style and longevity.\n\
Its thoughtful design includes ample space for cards and cash. The compact size makes it ideal for everyday use.\n\
This polo leather wallet is a perfect blend of practicality and sophistication. It's designed for the modern gentleman who appreciates quality.\n";

const REMINDERS: &str = "Remember to:\n\
- keep each bullet in About this item to at most 6 words\n\
- ensure each line in the description contains two sentences\n\
- remove extra spaces after (.)\n\
- place the color line at the end of the description like that 'Available colors: red'\n";

fn quoted_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|c| format!("'{c}'")).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_name_prompt_embeds_caption_and_format() {
        let prompt = product_name_prompt("black leather wallet with card slots");
        assert!(prompt.contains("based on the caption black leather wallet with card slots"));
        assert!(prompt.contains("[your brand name]  <Product Details>"));
        assert!(prompt.contains("'[your brand name]T-Shirts Round Neck Cotton Full Sleeve'"));
        assert!(prompt.contains("without any (:) and (,)"));
    }

    #[test]
    fn test_description_prompt_with_colors() {
        let colors = vec!["#be7c60".to_string(), "#1428c8".to_string()];
        let prompt = description_prompt(
            "man in blue shirt",
            "[your brand name] Oxford Shirt",
            Some(&colors),
        );

        assert!(prompt.contains("Caption: man in blue shirt\n"));
        assert!(prompt.contains("Product Title: [your brand name] Oxford Shirt\n"));
        assert!(prompt.contains("Replace these hex codes ['#be7c60', '#1428c8'] with color names."));
        assert!(prompt.contains("exclude any colors in caption man in blue shirt"));
        assert!(prompt.contains(
            "Available colors:  <strong>#BE7C60</strong>, <strong>#1428C8</strong>.</p>\n"
        ));
        assert!(!prompt.contains("No colors provided"));
    }

    #[test]
    fn test_description_prompt_without_colors() {
        let prompt = description_prompt("red dress", "[your brand name] Midi Dress", None);
        assert!(prompt.contains(
            "No colors provided. Focus on materials, fit, and benefits without using colors."
        ));
        assert!(prompt.contains("Available colors:  \n"));
        assert!(!prompt.contains("<strong>#"));
    }

    #[test]
    fn test_empty_color_list_is_treated_as_absent() {
        let empty: Vec<String> = Vec::new();
        let with_empty = description_prompt("red dress", "Midi Dress", Some(&empty));
        let with_none = description_prompt("red dress", "Midi Dress", None);
        assert_eq!(with_empty, with_none);
    }

    #[test]
    fn test_description_prompt_carries_requirements_and_example() {
        let prompt = description_prompt("shoe", "Runner", None);
        assert!(prompt.contains("\"About this item\" and \"Product description\""));
        assert!(prompt.contains("1. Limit the description to exactly 150 words."));
        assert!(prompt.contains("Secure closure to protect your valuables."));
        let requirements = prompt.find("Important Requirements").unwrap();
        let example = prompt.find("Expected Output Format").unwrap();
        assert!(requirements < example);
    }
}
